//! Kind-discriminated resource envelopes and the ordered, named resource list.
//!
//! Every resource entry in a deploy spec or app spec is a mapping whose `Type` field names
//! its kind. Decoding reads the discriminator first and then decodes the whole mapping as
//! that kind's payload, so an envelope always holds exactly one payload matching its kind.
//! Unrecognised kinds never fail the document: they decode to `Unknown` and are skipped
//! by the reconciler.

use super::ecs::{ServiceAppSpec, ServiceDeploySpec};
use super::lambda::{FunctionAppSpec, FunctionDeploySpec};
use serde::de::{self, DeserializeOwned, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::fmt;
use std::marker::PhantomData;

/// Field carrying the kind discriminator.
pub const TYPE_FIELD: &str = "Type";

/// The resource kinds this tool knows how to reconcile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    /// `AWS::Lambda::Function`
    Function,
    /// `AWS::ECS::Service`
    Service,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 2] = [ResourceKind::Function, ResourceKind::Service];

    pub fn tag(self) -> &'static str {
        match self {
            ResourceKind::Function => "AWS::Lambda::Function",
            ResourceKind::Service => "AWS::ECS::Service",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Deploy spec entries may leave out `Type`; their payload key then identifies them.
    fn infer_desired(fields: &Value) -> Option<Self> {
        if fields.get("FunctionCode").is_some() {
            Some(ResourceKind::Function)
        } else if fields.get("RegisterTaskDefinitionInput").is_some() {
            Some(ResourceKind::Service)
        } else {
            None
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

fn type_tag(fields: &Value) -> Option<String> {
    fields
        .get(TYPE_FIELD)
        .and_then(Value::as_str)
        .map(str::to_owned)
}

fn decode_payload<T: DeserializeOwned, E: de::Error>(kind: ResourceKind, fields: Value) -> Result<T, E> {
    serde_yaml::from_value(fields).map_err(|e| E::custom(format!("invalid {kind} resource: {e}")))
}

fn serialize_empty<S: Serializer>(serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_map(Some(0))?.end()
}

// =============================================================================
// DEPLOY SPEC ENVELOPE
// =============================================================================

/// A desired-state resource from the deploy spec.
#[derive(Debug, Clone, PartialEq)]
pub enum DeploySpecResource {
    Function(FunctionDeploySpec),
    Service(ServiceDeploySpec),
    /// A kind this tool does not handle. Holds the raw tag, empty when there was none.
    Unknown(String),
}

impl DeploySpecResource {
    pub fn kind(&self) -> Option<ResourceKind> {
        match self {
            DeploySpecResource::Function(_) => Some(ResourceKind::Function),
            DeploySpecResource::Service(_) => Some(ResourceKind::Service),
            DeploySpecResource::Unknown(_) => None,
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            DeploySpecResource::Unknown(tag) => tag,
            known => known.kind().map(ResourceKind::tag).unwrap_or_default(),
        }
    }
}

impl<'de> Deserialize<'de> for DeploySpecResource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Value::deserialize(deserializer)?;
        let tag = type_tag(&fields);
        let kind = match tag.as_deref() {
            Some(tag) => ResourceKind::from_tag(tag),
            None => ResourceKind::infer_desired(&fields),
        };
        match kind {
            Some(kind @ ResourceKind::Function) => decode_payload(kind, fields).map(Self::Function),
            Some(kind @ ResourceKind::Service) => decode_payload(kind, fields).map(Self::Service),
            None => Ok(Self::Unknown(tag.unwrap_or_default())),
        }
    }
}

impl Serialize for DeploySpecResource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DeploySpecResource::Function(spec) => spec.serialize(serializer),
            DeploySpecResource::Service(spec) => spec.serialize(serializer),
            DeploySpecResource::Unknown(_) => serialize_empty(serializer),
        }
    }
}

impl From<FunctionDeploySpec> for DeploySpecResource {
    fn from(spec: FunctionDeploySpec) -> Self {
        DeploySpecResource::Function(spec)
    }
}

impl From<ServiceDeploySpec> for DeploySpecResource {
    fn from(spec: ServiceDeploySpec) -> Self {
        DeploySpecResource::Service(spec)
    }
}

// =============================================================================
// APP SPEC ENVELOPE
// =============================================================================

/// An app spec resource: a skeleton before reconciliation, the outcome after it.
#[derive(Debug, Clone, PartialEq)]
pub enum AppSpecResource {
    Function(FunctionAppSpec),
    Service(ServiceAppSpec),
    Unknown(String),
}

impl AppSpecResource {
    pub fn kind(&self) -> Option<ResourceKind> {
        match self {
            AppSpecResource::Function(_) => Some(ResourceKind::Function),
            AppSpecResource::Service(_) => Some(ResourceKind::Service),
            AppSpecResource::Unknown(_) => None,
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            AppSpecResource::Function(spec) => &spec.resource_type,
            AppSpecResource::Service(spec) => &spec.resource_type,
            AppSpecResource::Unknown(tag) => tag,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionAppSpec> {
        match self {
            AppSpecResource::Function(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn as_service(&self) -> Option<&ServiceAppSpec> {
        match self {
            AppSpecResource::Service(spec) => Some(spec),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for AppSpecResource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let fields = Value::deserialize(deserializer)?;
        let tag = type_tag(&fields);
        match tag.as_deref().and_then(ResourceKind::from_tag) {
            Some(kind @ ResourceKind::Function) => decode_payload(kind, fields).map(Self::Function),
            Some(kind @ ResourceKind::Service) => decode_payload(kind, fields).map(Self::Service),
            None => Ok(Self::Unknown(tag.unwrap_or_default())),
        }
    }
}

impl Serialize for AppSpecResource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AppSpecResource::Function(spec) => spec.serialize(serializer),
            AppSpecResource::Service(spec) => spec.serialize(serializer),
            AppSpecResource::Unknown(_) => serialize_empty(serializer),
        }
    }
}

impl From<FunctionAppSpec> for AppSpecResource {
    fn from(spec: FunctionAppSpec) -> Self {
        AppSpecResource::Function(spec)
    }
}

impl From<ServiceAppSpec> for AppSpecResource {
    fn from(spec: ServiceAppSpec) -> Self {
        AppSpecResource::Service(spec)
    }
}

// =============================================================================
// NAMED RESOURCE LIST
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct NamedResource<T> {
    pub name: String,
    pub resource: T,
}

/// The `Resources` sequence of a document: a list of `name: resource` maps.
///
/// A list item holding several names contributes all of them, in document order.
/// Serialization always writes one name per list item.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceList<T>(Vec<NamedResource<T>>);

impl<T> Default for ResourceList<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> ResourceList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, resource: impl Into<T>) {
        self.0.push(NamedResource {
            name: name.into(),
            resource: resource.into(),
        });
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NamedResource<T>> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|entry| entry.name.as_str()).collect()
    }

    /// First resource declared under `name`.
    pub fn get(&self, name: &str) -> Option<&T> {
        self.0
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.resource)
    }
}

impl<'a, T> IntoIterator for &'a ResourceList<T> {
    type Item = &'a NamedResource<T>;
    type IntoIter = std::slice::Iter<'a, NamedResource<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<N: Into<String>, T> FromIterator<(N, T)> for ResourceList<T> {
    fn from_iter<I: IntoIterator<Item = (N, T)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(name, resource)| NamedResource {
                    name: name.into(),
                    resource,
                })
                .collect(),
        )
    }
}

struct SingleEntry<'a, T>(&'a NamedResource<T>);

impl<T: Serialize> Serialize for SingleEntry<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.0.name, &self.0.resource)?;
        map.end()
    }
}

impl<T: Serialize> Serialize for ResourceList<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for entry in &self.0 {
            seq.serialize_element(&SingleEntry(entry))?;
        }
        seq.end()
    }
}

/// One list item: a map of one or more `name: resource` pairs.
struct NamedEntries<T>(Vec<NamedResource<T>>);

impl<'de, T: Deserialize<'de>> Deserialize<'de> for NamedEntries<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
            type Value = NamedEntries<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of resource names to resources")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                while let Some((name, resource)) = map.next_entry::<String, T>()? {
                    entries.push(NamedResource { name, resource });
                }
                Ok(NamedEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for ResourceList<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ListVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for ListVisitor<T> {
            type Value = ResourceList<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a sequence of resource maps")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(ResourceList::default())
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut list = ResourceList::default();
                while let Some(NamedEntries(entries)) = seq.next_element::<NamedEntries<T>>()? {
                    list.0.extend(entries);
                }
                Ok(list)
            }
        }

        deserializer.deserialize_seq(ListVisitor(PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FunctionCode;

    #[test]
    fn test_app_spec_resource_decodes_by_type() {
        let yaml = r#"
Type: AWS::Lambda::Function
Properties:
  Name: my-function
  Alias: live
"#;
        let resource: AppSpecResource = serde_yaml::from_str(yaml).unwrap();
        let function = resource.as_function().expect("Expected a function resource");
        assert_eq!(function.resource_type, "AWS::Lambda::Function");
        assert_eq!(function.properties.name, "my-function");
        assert_eq!(function.properties.alias, "live");
        assert!(function.properties.current_version.is_empty());

        let yaml = r#"
Type: AWS::ECS::Service
Properties:
  TaskDefinition: ""
  LoadBalancerInfo:
    ContainerName: web
    ContainerPort: 80
"#;
        let resource: AppSpecResource = serde_yaml::from_str(yaml).unwrap();
        let service = resource.as_service().expect("Expected a service resource");
        assert_eq!(service.properties.load_balancer_info.as_ref().unwrap().container_port, 80);
    }

    #[test]
    fn test_unknown_type_decodes_without_payload() {
        let yaml = "Type: AWS::S3::Bucket\nProperties:\n  BucketName: assets\n";
        let resource: AppSpecResource = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(resource, AppSpecResource::Unknown("AWS::S3::Bucket".to_string()));
        assert_eq!(resource.kind(), None);

        // Not even a mapping: still a valid, empty envelope.
        let resource: AppSpecResource = serde_yaml::from_str("~").unwrap();
        assert_eq!(resource, AppSpecResource::Unknown(String::new()));
    }

    #[test]
    fn test_known_type_with_malformed_payload_is_rejected() {
        let yaml = "Type: AWS::Lambda::Function\nProperties: not-a-map\n";
        let err = serde_yaml::from_str::<AppSpecResource>(yaml).unwrap_err();
        assert!(err.to_string().contains("AWS::Lambda::Function"), "{err}");
    }

    #[test]
    fn test_deploy_spec_resource_infers_kind_without_type() {
        let yaml = "FunctionCode:\n  S3Bucket: b\n  S3Key: k\n";
        let resource: DeploySpecResource = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(resource.kind(), Some(ResourceKind::Function));
        assert_eq!(resource.tag(), "AWS::Lambda::Function");

        let yaml = "RegisterTaskDefinitionInput:\n  Family: web\n";
        let resource: DeploySpecResource = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(resource.kind(), Some(ResourceKind::Service));

        let resource: DeploySpecResource = serde_yaml::from_str("Bucket: assets\n").unwrap();
        assert_eq!(resource, DeploySpecResource::Unknown(String::new()));
    }

    #[test]
    fn test_explicit_type_wins_over_inference() {
        let yaml = "Type: Custom::Thing\nFunctionCode:\n  S3Bucket: b\n  S3Key: k\n";
        let resource: DeploySpecResource = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(resource, DeploySpecResource::Unknown("Custom::Thing".to_string()));
    }

    #[test]
    fn test_deploy_spec_resource_does_not_emit_type() {
        let yaml = "Type: AWS::Lambda::Function\nFunctionCode:\n  S3Bucket: b\n  S3Key: k\n";
        let resource: DeploySpecResource = serde_yaml::from_str(yaml).unwrap();
        let emitted = serde_yaml::to_value(&resource).unwrap();
        assert!(emitted.get(TYPE_FIELD).is_none());
        assert_eq!(emitted["FunctionCode"]["S3Key"].as_str(), Some("k"));
    }

    #[test]
    fn test_resource_list_keeps_document_order() {
        let yaml = r#"
- second:
    FunctionCode: { S3Bucket: b, S3Key: two }
- first:
    FunctionCode: { S3Bucket: b, S3Key: one }
  third:
    FunctionCode: { S3Bucket: b, S3Key: three }
"#;
        let list: ResourceList<DeploySpecResource> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(list.names(), vec!["second", "first", "third"]);
        assert_eq!(
            list.get("third"),
            Some(&DeploySpecResource::Function(crate::model::FunctionDeploySpec::new(
                FunctionCode::new("b", "three")
            )))
        );
    }

    #[test]
    fn test_resource_list_writes_one_name_per_item() {
        let mut list = ResourceList::<AppSpecResource>::new();
        list.push("a", FunctionAppSpec::new("fn-a", "release"));
        list.push("b", FunctionAppSpec::new("fn-b", "release"));

        let emitted = serde_yaml::to_value(&list).unwrap();
        let items = emitted.as_sequence().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["a"]["Properties"]["Name"].as_str(), Some("fn-a"));
        assert_eq!(items[1]["b"]["Type"].as_str(), Some("AWS::Lambda::Function"));
    }
}
