//! # ECS Client
//!
//! [`EcsApi`] is the single ECS operation the service reconciler needs. [`AwsEcsClient`]
//! translates a [`TaskDefinitionRegistration`] member by member into the SDK request; a
//! member the SDK rejects while building (a missing required field) fails the call before
//! anything is sent.
use crate::clients::ProviderError;
use crate::model::{self, TaskDefinitionRegistration};
use async_trait::async_trait;
use aws_sdk_ecs::error::BuildError;
use aws_sdk_ecs::types;
use std::sync::Arc;
use tracing::{debug, instrument};

#[async_trait]
pub trait EcsApi: Send + Sync {
    /// Register a new task definition revision and return its ARN.
    async fn register_task_definition(
        &self,
        registration: &TaskDefinitionRegistration,
    ) -> Result<String, ProviderError>;
}

/// [`EcsApi`] backed by the AWS SDK.
#[derive(Clone, Debug)]
pub struct AwsEcsClient {
    inner: aws_sdk_ecs::Client,
}

impl AwsEcsClient {
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            inner: aws_sdk_ecs::Client::new(config),
        }
    }
}

fn ecs_error<E>(err: E) -> ProviderError
where
    aws_sdk_ecs::Error: From<E>,
{
    ProviderError::Ecs(Arc::new(aws_sdk_ecs::Error::from(err)))
}

fn build_error(err: BuildError) -> ProviderError {
    ProviderError::Ecs(Arc::new(err))
}

/// The SDK distinguishes an absent list from an empty one; absent is what we mean.
fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}

fn all<'a, S: 'a, T>(
    items: impl IntoIterator<Item = &'a S>,
    convert: impl Fn(&S) -> Result<T, ProviderError>,
) -> Result<Option<Vec<T>>, ProviderError> {
    let converted = items
        .into_iter()
        .map(convert)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(non_empty(converted))
}

fn secret(secret: &model::Secret) -> Result<types::Secret, ProviderError> {
    types::Secret::builder()
        .name(&secret.name)
        .value_from(&secret.value_from)
        .build()
        .map_err(build_error)
}

fn port_mapping(mapping: &model::PortMapping) -> types::PortMapping {
    types::PortMapping::builder()
        .set_container_port(mapping.container_port)
        .set_host_port(mapping.host_port)
        .set_protocol(mapping.protocol.as_deref().map(types::TransportProtocol::from))
        .set_name(mapping.name.clone())
        .set_app_protocol(mapping.app_protocol.as_deref().map(types::ApplicationProtocol::from))
        .set_container_port_range(mapping.container_port_range.clone())
        .build()
}

fn log_configuration(
    config: &model::LogConfiguration,
) -> Result<types::LogConfiguration, ProviderError> {
    let mut builder = types::LogConfiguration::builder()
        .log_driver(types::LogDriver::from(config.log_driver.as_str()))
        .set_secret_options(all(&config.secret_options, secret)?);
    for (key, value) in &config.options {
        builder = builder.options(key, value);
    }
    builder.build().map_err(build_error)
}

fn health_check(check: &model::HealthCheck) -> Result<types::HealthCheck, ProviderError> {
    types::HealthCheck::builder()
        .set_command(Some(check.command.clone()))
        .set_interval(check.interval)
        .set_timeout(check.timeout)
        .set_retries(check.retries)
        .set_start_period(check.start_period)
        .build()
        .map_err(build_error)
}

fn dependency(
    dependency: &model::ContainerDependency,
) -> Result<types::ContainerDependency, ProviderError> {
    types::ContainerDependency::builder()
        .container_name(&dependency.container_name)
        .condition(types::ContainerCondition::from(dependency.condition.as_str()))
        .build()
        .map_err(build_error)
}

fn ulimit(ulimit: &model::Ulimit) -> Result<types::Ulimit, ProviderError> {
    types::Ulimit::builder()
        .name(types::UlimitName::from(ulimit.name.as_str()))
        .soft_limit(ulimit.soft_limit)
        .hard_limit(ulimit.hard_limit)
        .build()
        .map_err(build_error)
}

fn resource_requirement(
    requirement: &model::ResourceRequirement,
) -> Result<types::ResourceRequirement, ProviderError> {
    types::ResourceRequirement::builder()
        .set_type(Some(types::ResourceType::from(requirement.resource_type.as_str())))
        .value(&requirement.value)
        .build()
        .map_err(build_error)
}

fn repository_credentials(
    credentials: &model::RepositoryCredentials,
) -> Result<types::RepositoryCredentials, ProviderError> {
    types::RepositoryCredentials::builder()
        .credentials_parameter(&credentials.credentials_parameter)
        .build()
        .map_err(build_error)
}

fn container_definition(
    definition: &model::ContainerDefinition,
) -> Result<types::ContainerDefinition, ProviderError> {
    let mut builder = types::ContainerDefinition::builder()
        .name(&definition.name)
        .image(&definition.image)
        .set_repository_credentials(
            definition
                .repository_credentials
                .as_ref()
                .map(repository_credentials)
                .transpose()?,
        )
        .set_cpu(definition.cpu)
        .set_memory(definition.memory)
        .set_memory_reservation(definition.memory_reservation)
        .set_essential(definition.essential)
        .set_links(non_empty(definition.links.clone()))
        .set_port_mappings(non_empty(
            definition.port_mappings.iter().map(port_mapping).collect(),
        ))
        .set_entry_point(non_empty(definition.entry_point.clone()))
        .set_command(non_empty(definition.command.clone()))
        .set_environment(non_empty(
            definition
                .environment
                .iter()
                .map(|variable| {
                    types::KeyValuePair::builder()
                        .name(&variable.name)
                        .value(&variable.value)
                        .build()
                })
                .collect(),
        ))
        .set_secrets(all(&definition.secrets, secret)?)
        .set_mount_points(non_empty(
            definition
                .mount_points
                .iter()
                .map(|mount| {
                    types::MountPoint::builder()
                        .set_source_volume(mount.source_volume.clone())
                        .set_container_path(mount.container_path.clone())
                        .set_read_only(mount.read_only)
                        .build()
                })
                .collect(),
        ))
        .set_volumes_from(non_empty(
            definition
                .volumes_from
                .iter()
                .map(|from| {
                    types::VolumeFrom::builder()
                        .set_source_container(from.source_container.clone())
                        .set_read_only(from.read_only)
                        .build()
                })
                .collect(),
        ))
        .set_depends_on(all(&definition.depends_on, dependency)?)
        .set_start_timeout(definition.start_timeout)
        .set_stop_timeout(definition.stop_timeout)
        .set_hostname(definition.hostname.clone())
        .set_user(definition.user.clone())
        .set_working_directory(definition.working_directory.clone())
        .set_disable_networking(definition.disable_networking)
        .set_privileged(definition.privileged)
        .set_readonly_root_filesystem(definition.readonly_root_filesystem)
        .set_dns_servers(non_empty(definition.dns_servers.clone()))
        .set_dns_search_domains(non_empty(definition.dns_search_domains.clone()))
        .set_docker_security_options(non_empty(definition.docker_security_options.clone()))
        .set_interactive(definition.interactive)
        .set_pseudo_terminal(definition.pseudo_terminal)
        .set_ulimits(all(&definition.ulimits, ulimit)?)
        .set_log_configuration(
            definition
                .log_configuration
                .as_ref()
                .map(log_configuration)
                .transpose()?,
        )
        .set_health_check(definition.health_check.as_ref().map(health_check).transpose()?)
        .set_resource_requirements(all(&definition.resource_requirements, resource_requirement)?);

    for (key, value) in &definition.docker_labels {
        builder = builder.docker_labels(key, value);
    }
    Ok(builder.build())
}

fn volume(volume: &model::Volume) -> Result<types::Volume, ProviderError> {
    let efs = volume
        .efs_volume_configuration
        .as_ref()
        .map(|efs| {
            types::EfsVolumeConfiguration::builder()
                .file_system_id(&efs.file_system_id)
                .set_root_directory(efs.root_directory.clone())
                .set_transit_encryption(
                    efs.transit_encryption
                        .as_deref()
                        .map(types::EfsTransitEncryption::from),
                )
                .set_transit_encryption_port(efs.transit_encryption_port)
                .build()
                .map_err(build_error)
        })
        .transpose()?;

    Ok(types::Volume::builder()
        .name(&volume.name)
        .set_host(volume.host.as_ref().map(|host| {
            types::HostVolumeProperties::builder()
                .set_source_path(host.source_path.clone())
                .build()
        }))
        .set_efs_volume_configuration(efs)
        .set_configured_at_launch(volume.configured_at_launch)
        .build())
}

fn placement_constraint(
    constraint: &model::PlacementConstraint,
) -> types::TaskDefinitionPlacementConstraint {
    types::TaskDefinitionPlacementConstraint::builder()
        .set_type(Some(types::TaskDefinitionPlacementConstraintType::from(
            constraint.constraint_type.as_str(),
        )))
        .set_expression(constraint.expression.clone())
        .build()
}

#[async_trait]
impl EcsApi for AwsEcsClient {
    #[instrument(skip(self, registration), fields(family = %registration.family))]
    async fn register_task_definition(
        &self,
        registration: &TaskDefinitionRegistration,
    ) -> Result<String, ProviderError> {
        let request = self
            .inner
            .register_task_definition()
            .family(&registration.family)
            .set_task_role_arn(registration.task_role_arn.clone())
            .set_execution_role_arn(registration.execution_role_arn.clone())
            .set_network_mode(registration.network_mode.as_deref().map(types::NetworkMode::from))
            .set_container_definitions(all(
                &registration.container_definitions,
                container_definition,
            )?)
            .set_volumes(all(&registration.volumes, volume)?)
            .set_placement_constraints(non_empty(
                registration
                    .placement_constraints
                    .iter()
                    .map(placement_constraint)
                    .collect(),
            ))
            .set_requires_compatibilities(non_empty(
                registration
                    .requires_compatibilities
                    .iter()
                    .map(|compatibility| types::Compatibility::from(compatibility.as_str()))
                    .collect(),
            ))
            .set_cpu(registration.cpu.clone())
            .set_memory(registration.memory.clone())
            .set_tags(non_empty(
                registration
                    .tags
                    .iter()
                    .map(|tag| types::Tag::builder().key(&tag.key).value(&tag.value).build())
                    .collect(),
            ))
            .set_pid_mode(registration.pid_mode.as_deref().map(types::PidMode::from))
            .set_ipc_mode(registration.ipc_mode.as_deref().map(types::IpcMode::from))
            .set_ephemeral_storage(registration.ephemeral_storage.as_ref().map(|storage| {
                types::EphemeralStorage::builder()
                    .size_in_gib(storage.size_in_gib)
                    .build()
            }))
            .set_runtime_platform(registration.runtime_platform.as_ref().map(|platform| {
                types::RuntimePlatform::builder()
                    .set_cpu_architecture(
                        platform
                            .cpu_architecture
                            .as_deref()
                            .map(types::CpuArchitecture::from),
                    )
                    .set_operating_system_family(
                        platform
                            .operating_system_family
                            .as_deref()
                            .map(types::OsFamily::from),
                    )
                    .build()
            }))
            .set_enable_fault_injection(registration.enable_fault_injection);

        debug!("Sending request");
        let output = request.send().await.map_err(ecs_error)?;
        output
            .task_definition()
            .and_then(|task_definition| task_definition.task_definition_arn())
            .map(str::to_owned)
            .ok_or(ProviderError::MissingField {
                operation: "RegisterTaskDefinition",
                field: "TaskDefinition.TaskDefinitionArn",
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::error::Error;

    fn web_container() -> model::ContainerDefinition {
        model::ContainerDefinition {
            name: "web".to_string(),
            image: "nginx:1.27".to_string(),
            essential: Some(true),
            port_mappings: vec![model::PortMapping {
                container_port: Some(80),
                protocol: Some("tcp".to_string()),
                ..model::PortMapping::default()
            }],
            secrets: vec![model::Secret {
                name: "DB_PASSWORD".to_string(),
                value_from: "arn:aws:ssm:us-east-1:123456789012:parameter/db".to_string(),
            }],
            mount_points: vec![model::MountPoint {
                source_volume: Some("static".to_string()),
                container_path: Some("/usr/share/nginx/html".to_string()),
                read_only: Some(true),
            }],
            depends_on: vec![model::ContainerDependency {
                container_name: "init".to_string(),
                condition: "SUCCESS".to_string(),
            }],
            ulimits: vec![model::Ulimit {
                name: "nofile".to_string(),
                soft_limit: 1024,
                hard_limit: 4096,
            }],
            docker_labels: BTreeMap::from([("team".to_string(), "edge".to_string())]),
            log_configuration: Some(model::LogConfiguration {
                log_driver: "awslogs".to_string(),
                options: BTreeMap::from([(
                    "awslogs-group".to_string(),
                    "/ecs/web".to_string(),
                )]),
                secret_options: Vec::new(),
            }),
            health_check: Some(model::HealthCheck {
                command: vec!["CMD-SHELL".to_string(), "curl -f http://localhost/".to_string()],
                interval: Some(30),
                retries: Some(3),
                ..model::HealthCheck::default()
            }),
            ..model::ContainerDefinition::default()
        }
    }

    #[test]
    fn test_container_definition_carries_every_declared_member() {
        let built = container_definition(&web_container()).expect("Failed to build container");

        assert_eq!(built.name(), Some("web"));
        assert_eq!(built.image(), Some("nginx:1.27"));
        assert_eq!(built.essential(), Some(true));

        let ports = built.port_mappings();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].container_port(), Some(80));
        assert_eq!(ports[0].protocol(), Some(&types::TransportProtocol::Tcp));

        assert_eq!(built.secrets().len(), 1);
        assert_eq!(built.secrets()[0].name(), "DB_PASSWORD");
        assert_eq!(
            built.secrets()[0].value_from(),
            "arn:aws:ssm:us-east-1:123456789012:parameter/db"
        );

        assert_eq!(built.mount_points()[0].source_volume(), Some("static"));
        assert_eq!(built.mount_points()[0].read_only(), Some(true));
        assert_eq!(built.depends_on()[0].container_name(), "init");
        assert_eq!(built.depends_on()[0].condition(), &types::ContainerCondition::Success);
        assert_eq!(built.ulimits()[0].name(), &types::UlimitName::Nofile);
        assert_eq!(built.ulimits()[0].hard_limit(), 4096);
        assert_eq!(
            built.docker_labels().and_then(|labels| labels.get("team")),
            Some(&"edge".to_string())
        );

        let logs = built.log_configuration().expect("Missing log configuration");
        assert_eq!(logs.log_driver(), &types::LogDriver::Awslogs);
        assert_eq!(
            logs.options().and_then(|options| options.get("awslogs-group")),
            Some(&"/ecs/web".to_string())
        );

        let health = built.health_check().expect("Missing health check");
        assert_eq!(health.command(), ["CMD-SHELL", "curl -f http://localhost/"]);
        assert_eq!(health.interval(), Some(30));
        assert_eq!(health.retries(), Some(3));
        assert_eq!(health.timeout(), None);
    }

    #[test]
    fn test_undeclared_lists_stay_absent() {
        let built = container_definition(&model::ContainerDefinition {
            name: "worker".to_string(),
            image: "worker:1".to_string(),
            ..model::ContainerDefinition::default()
        })
        .unwrap();

        assert!(built.port_mappings().is_empty());
        assert!(built.secrets().is_empty());
        assert!(built.log_configuration().is_none());
        assert!(built.health_check().is_none());
        assert!(built.docker_labels().is_none());
    }

    #[test]
    fn test_volume_with_efs_configuration() {
        let built = volume(&model::Volume {
            name: "shared".to_string(),
            efs_volume_configuration: Some(model::EfsVolumeConfiguration {
                file_system_id: "fs-12345678".to_string(),
                root_directory: Some("/exports".to_string()),
                transit_encryption: Some("ENABLED".to_string()),
                transit_encryption_port: None,
            }),
            ..model::Volume::default()
        })
        .unwrap();

        assert_eq!(built.name(), Some("shared"));
        let efs = built.efs_volume_configuration().expect("Missing EFS configuration");
        assert_eq!(efs.file_system_id(), "fs-12345678");
        assert_eq!(efs.root_directory(), Some("/exports"));
        assert_eq!(
            efs.transit_encryption(),
            Some(&types::EfsTransitEncryption::Enabled)
        );
        assert!(built.host().is_none());
    }

    #[test]
    fn test_build_failure_keeps_sdk_error_as_source() {
        let err = types::HealthCheck::builder()
            .build()
            .map_err(build_error)
            .unwrap_err();

        assert!(matches!(err, ProviderError::Ecs(_)));
        assert!(err.source().is_some_and(|source| source.to_string().contains("command")));
    }
}
