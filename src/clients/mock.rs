//! # Mock Providers
//!
//! In-memory stand-ins for [`LambdaApi`] and [`EcsApi`] that let reconcilers be tested
//! without touching AWS.
//!
//! Each mock holds a queue of expectations. Every provider call pops the next one and
//! answers with its canned response; a call that does not match the head of the queue
//! panics. Every call is recorded, so tests can assert on arguments and on the absence of
//! calls (dry runs).
//!
//! ```ignore
//! let lambda = MockLambda::new();
//! lambda.expect_get_alias().return_ok("3");
//! lambda.expect_update_function_code().return_ok(CodeRevision::new("r1", "c1"));
//! lambda.expect_publish_version().return_ok("4");
//!
//! let reconciler = FunctionReconciler::new(Arc::new(lambda.clone()));
//! // ... reconcile ...
//! lambda.verify(); // Ensures all expectations were met
//! ```

use crate::clients::{CodeRevision, EcsApi, LambdaApi, ProviderError};
use crate::model::{FunctionCode, TaskDefinitionRegistration};
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex};

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

/// Builder returned by the `expect_*` methods. Finish it with a response.
pub struct ExpectationBuilder<T, E> {
    queue: Arc<Mutex<VecDeque<E>>>,
    wrap: fn(Result<T, ProviderError>) -> E,
}

impl<T, E> ExpectationBuilder<T, E> {
    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, value: impl Into<T>) {
        self.push(Ok(value.into()));
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: ProviderError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<T, ProviderError>) {
        self.queue.lock().unwrap().push_back((self.wrap)(response));
    }
}

// =============================================================================
// LAMBDA
// =============================================================================

/// A call received by [`MockLambda`].
#[derive(Debug, Clone, PartialEq)]
pub enum LambdaCall {
    GetAlias {
        function_name: String,
        alias: String,
    },
    UpdateFunctionCode {
        function_name: String,
        code: FunctionCode,
    },
    GetFunctionEnvironment {
        function_name: String,
    },
    UpdateFunctionEnvironment {
        function_name: String,
        revision: CodeRevision,
        variables: BTreeMap<String, String>,
    },
    PublishVersion {
        function_name: String,
        revision: CodeRevision,
        description: String,
    },
}

#[derive(Debug)]
pub enum LambdaExpectation {
    GetAlias(Result<String, ProviderError>),
    UpdateFunctionCode(Result<CodeRevision, ProviderError>),
    GetFunctionEnvironment(Result<BTreeMap<String, String>, ProviderError>),
    UpdateFunctionEnvironment(Result<CodeRevision, ProviderError>),
    PublishVersion(Result<String, ProviderError>),
}

/// A mock [`LambdaApi`] with expectation tracking. Clones share state.
#[derive(Clone, Default)]
pub struct MockLambda {
    expectations: Arc<Mutex<VecDeque<LambdaExpectation>>>,
    calls: Arc<Mutex<Vec<LambdaCall>>>,
}

impl MockLambda {
    /// Creates a new mock with no expectations.
    pub fn new() -> Self {
        Self::default()
    }

    fn builder<T>(&self, wrap: fn(Result<T, ProviderError>) -> LambdaExpectation) -> ExpectationBuilder<T, LambdaExpectation> {
        ExpectationBuilder {
            queue: self.expectations.clone(),
            wrap,
        }
    }

    pub fn expect_get_alias(&self) -> ExpectationBuilder<String, LambdaExpectation> {
        self.builder(LambdaExpectation::GetAlias)
    }

    pub fn expect_update_function_code(&self) -> ExpectationBuilder<CodeRevision, LambdaExpectation> {
        self.builder(LambdaExpectation::UpdateFunctionCode)
    }

    pub fn expect_get_function_environment(
        &self,
    ) -> ExpectationBuilder<BTreeMap<String, String>, LambdaExpectation> {
        self.builder(LambdaExpectation::GetFunctionEnvironment)
    }

    pub fn expect_update_function_environment(
        &self,
    ) -> ExpectationBuilder<CodeRevision, LambdaExpectation> {
        self.builder(LambdaExpectation::UpdateFunctionEnvironment)
    }

    pub fn expect_publish_version(&self) -> ExpectationBuilder<String, LambdaExpectation> {
        self.builder(LambdaExpectation::PublishVersion)
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<LambdaCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap();
        if !exps.is_empty() {
            panic!("Not all Lambda expectations were met. {} remaining", exps.len());
        }
    }

    fn next(&self, call: LambdaCall) -> LambdaExpectation {
        self.calls.lock().unwrap().push(call.clone());
        let expectation = self.expectations.lock().unwrap().pop_front();
        expectation.unwrap_or_else(|| panic!("Unexpected Lambda call: {call:?}"))
    }
}

#[async_trait]
impl LambdaApi for MockLambda {
    async fn get_alias(&self, function_name: &str, alias: &str) -> Result<String, ProviderError> {
        match self.next(LambdaCall::GetAlias {
            function_name: function_name.to_string(),
            alias: alias.to_string(),
        }) {
            LambdaExpectation::GetAlias(response) => response,
            other => panic!("Expected {other:?}, got GetAlias"),
        }
    }

    async fn update_function_code(
        &self,
        function_name: &str,
        code: &FunctionCode,
    ) -> Result<CodeRevision, ProviderError> {
        match self.next(LambdaCall::UpdateFunctionCode {
            function_name: function_name.to_string(),
            code: code.clone(),
        }) {
            LambdaExpectation::UpdateFunctionCode(response) => response,
            other => panic!("Expected {other:?}, got UpdateFunctionCode"),
        }
    }

    async fn get_function_environment(
        &self,
        function_name: &str,
    ) -> Result<BTreeMap<String, String>, ProviderError> {
        match self.next(LambdaCall::GetFunctionEnvironment {
            function_name: function_name.to_string(),
        }) {
            LambdaExpectation::GetFunctionEnvironment(response) => response,
            other => panic!("Expected {other:?}, got GetFunctionEnvironment"),
        }
    }

    async fn update_function_environment(
        &self,
        function_name: &str,
        revision: &CodeRevision,
        variables: &BTreeMap<String, String>,
    ) -> Result<CodeRevision, ProviderError> {
        match self.next(LambdaCall::UpdateFunctionEnvironment {
            function_name: function_name.to_string(),
            revision: revision.clone(),
            variables: variables.clone(),
        }) {
            LambdaExpectation::UpdateFunctionEnvironment(response) => response,
            other => panic!("Expected {other:?}, got UpdateFunctionEnvironment"),
        }
    }

    async fn publish_version(
        &self,
        function_name: &str,
        revision: &CodeRevision,
        description: &str,
    ) -> Result<String, ProviderError> {
        match self.next(LambdaCall::PublishVersion {
            function_name: function_name.to_string(),
            revision: revision.clone(),
            description: description.to_string(),
        }) {
            LambdaExpectation::PublishVersion(response) => response,
            other => panic!("Expected {other:?}, got PublishVersion"),
        }
    }
}

// =============================================================================
// ECS
// =============================================================================

/// A mock [`EcsApi`]. Records every registration payload it receives.
#[derive(Clone, Default)]
pub struct MockEcs {
    expectations: Arc<Mutex<VecDeque<Result<String, ProviderError>>>>,
    calls: Arc<Mutex<Vec<TaskDefinitionRegistration>>>,
}

impl MockEcs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_register_task_definition(
        &self,
    ) -> ExpectationBuilder<String, Result<String, ProviderError>> {
        ExpectationBuilder {
            queue: self.expectations.clone(),
            wrap: |response| response,
        }
    }

    pub fn calls(&self) -> Vec<TaskDefinitionRegistration> {
        self.calls.lock().unwrap().clone()
    }

    pub fn verify(&self) {
        let exps = self.expectations.lock().unwrap();
        if !exps.is_empty() {
            panic!("Not all ECS expectations were met. {} remaining", exps.len());
        }
    }
}

#[async_trait]
impl EcsApi for MockEcs {
    async fn register_task_definition(
        &self,
        registration: &TaskDefinitionRegistration,
    ) -> Result<String, ProviderError> {
        self.calls.lock().unwrap().push(registration.clone());
        let expectation = self.expectations.lock().unwrap().pop_front();
        expectation.unwrap_or_else(|| {
            panic!("Unexpected ECS call: RegisterTaskDefinition({})", registration.family)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_lambda_answers_in_order_and_records_calls() {
        let lambda = MockLambda::new();
        lambda.expect_get_alias().return_ok("7");
        lambda
            .expect_update_function_code()
            .return_err(ProviderError::lambda("AccessDenied"));

        assert_eq!(lambda.get_alias("fn", "live").await, Ok("7".to_string()));
        let code = FunctionCode::new("b", "k");
        assert!(lambda.update_function_code("fn", &code).await.is_err());

        assert_eq!(
            lambda.calls(),
            vec![
                LambdaCall::GetAlias {
                    function_name: "fn".to_string(),
                    alias: "live".to_string()
                },
                LambdaCall::UpdateFunctionCode {
                    function_name: "fn".to_string(),
                    code
                },
            ]
        );
        lambda.verify();
    }

    #[tokio::test]
    #[should_panic(expected = "Unexpected Lambda call")]
    async fn test_mock_lambda_panics_without_expectation() {
        let lambda = MockLambda::new();
        let _ = lambda.get_alias("fn", "release").await;
    }

    #[tokio::test]
    #[should_panic(expected = "got PublishVersion")]
    async fn test_mock_lambda_panics_on_out_of_order_call() {
        let lambda = MockLambda::new();
        lambda.expect_get_alias().return_ok("1");
        let _ = lambda
            .publish_version("fn", &CodeRevision::new("r", "c"), "")
            .await;
    }

    #[test]
    #[should_panic(expected = "1 remaining")]
    fn test_mock_ecs_verify_reports_unmet_expectations() {
        let ecs = MockEcs::new();
        ecs.expect_register_task_definition().return_ok("arn");
        ecs.verify();
    }
}
