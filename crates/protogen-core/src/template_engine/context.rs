//! Template context built from a `FileDescriptorProto`.
//!
//! Keys mirror the descriptor field names from `descriptor.proto`. Unset proto2
//! scalars render as their default value, enums as their symbolic name
//! (`TYPE_STRING`, `LABEL_REPEATED`), and comments are attached from
//! `source_code_info` when protoc includes it.

use std::collections::HashMap;

use prost_types::source_code_info::Location;
use prost_types::{
    DescriptorProto, EnumDescriptorProto, FieldDescriptorProto, FileDescriptorProto,
    MethodDescriptorProto, ServiceDescriptorProto,
};
use serde::Serialize;

// Field numbers from descriptor.proto, used to build source_code_info paths.
const FILE_MESSAGE_TYPE: i32 = 4;
const FILE_ENUM_TYPE: i32 = 5;
const FILE_SERVICE: i32 = 6;
const FILE_EXTENSION: i32 = 7;
const MESSAGE_FIELD: i32 = 2;
const MESSAGE_NESTED_TYPE: i32 = 3;
const MESSAGE_ENUM_TYPE: i32 = 4;
const MESSAGE_EXTENSION: i32 = 6;
const ENUM_VALUE: i32 = 2;
const SERVICE_METHOD: i32 = 2;

/// Top-level template context for one `.proto` file.
#[derive(Debug, Clone, Serialize)]
pub struct FileContext {
    pub name: String,
    pub package: String,
    pub syntax: String,
    pub dependency: Vec<String>,
    pub public_dependency: Vec<i32>,
    pub weak_dependency: Vec<i32>,
    pub message_type: Vec<MessageContext>,
    pub enum_type: Vec<EnumContext>,
    pub service: Vec<ServiceContext>,
    pub extension: Vec<FieldContext>,
    pub options: FileOptionsContext,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FileOptionsContext {
    pub go_package: String,
    pub java_package: String,
    pub java_outer_classname: String,
    pub java_multiple_files: bool,
    pub csharp_namespace: String,
    pub objc_class_prefix: String,
    pub php_namespace: String,
    pub ruby_package: String,
    pub swift_prefix: String,
    pub deprecated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageContext {
    pub name: String,
    /// Fully-qualified name without the leading dot (`pkg.Outer.Inner`).
    pub full_name: String,
    pub field: Vec<FieldContext>,
    pub nested_type: Vec<MessageContext>,
    pub enum_type: Vec<EnumContext>,
    pub extension: Vec<FieldContext>,
    pub oneof_decl: Vec<OneofContext>,
    pub reserved_name: Vec<String>,
    pub options: MessageOptionsContext,
    pub leading_comments: String,
    pub trailing_comments: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MessageOptionsContext {
    pub map_entry: bool,
    pub deprecated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OneofContext {
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldContext {
    pub name: String,
    pub number: i32,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub type_name: String,
    pub extendee: String,
    pub default_value: String,
    pub oneof_index: Option<i32>,
    pub json_name: String,
    pub proto3_optional: bool,
    pub options: FieldOptionsContext,
    pub leading_comments: String,
    pub trailing_comments: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FieldOptionsContext {
    pub deprecated: bool,
    pub packed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnumContext {
    pub name: String,
    pub full_name: String,
    pub value: Vec<EnumValueContext>,
    pub options: EnumOptionsContext,
    pub leading_comments: String,
    pub trailing_comments: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EnumOptionsContext {
    pub allow_alias: bool,
    pub deprecated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnumValueContext {
    pub name: String,
    pub number: i32,
    pub leading_comments: String,
    pub trailing_comments: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceContext {
    pub name: String,
    pub method: Vec<MethodContext>,
    pub leading_comments: String,
    pub trailing_comments: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MethodContext {
    pub name: String,
    pub input_type: String,
    pub output_type: String,
    pub client_streaming: bool,
    pub server_streaming: bool,
    pub leading_comments: String,
    pub trailing_comments: String,
}

impl FileContext {
    /// Build the template context for one file descriptor.
    pub fn from_descriptor(file: &FileDescriptorProto) -> Self {
        let builder = ContextBuilder::new(file);
        let package = file.package();

        let message_type = file
            .message_type
            .iter()
            .enumerate()
            .map(|(i, m)| builder.message(m, package, vec![FILE_MESSAGE_TYPE, i as i32]))
            .collect();
        let enum_type = file
            .enum_type
            .iter()
            .enumerate()
            .map(|(i, e)| builder.enumeration(e, package, vec![FILE_ENUM_TYPE, i as i32]))
            .collect();
        let service = file
            .service
            .iter()
            .enumerate()
            .map(|(i, s)| builder.service(s, vec![FILE_SERVICE, i as i32]))
            .collect();
        let extension = file
            .extension
            .iter()
            .enumerate()
            .map(|(i, f)| builder.field(f, vec![FILE_EXTENSION, i as i32]))
            .collect();

        let options = file
            .options
            .as_ref()
            .map(|o| FileOptionsContext {
                go_package: o.go_package().to_string(),
                java_package: o.java_package().to_string(),
                java_outer_classname: o.java_outer_classname().to_string(),
                java_multiple_files: o.java_multiple_files(),
                csharp_namespace: o.csharp_namespace().to_string(),
                objc_class_prefix: o.objc_class_prefix().to_string(),
                php_namespace: o.php_namespace().to_string(),
                ruby_package: o.ruby_package().to_string(),
                swift_prefix: o.swift_prefix().to_string(),
                deprecated: o.deprecated(),
            })
            .unwrap_or_default();

        Self {
            name: file.name().to_string(),
            package: package.to_string(),
            syntax: file.syntax().to_string(),
            dependency: file.dependency.clone(),
            public_dependency: file.public_dependency.clone(),
            weak_dependency: file.weak_dependency.clone(),
            message_type,
            enum_type,
            service,
            extension,
            options,
        }
    }
}

struct ContextBuilder<'a> {
    locations: HashMap<&'a [i32], &'a Location>,
}

impl<'a> ContextBuilder<'a> {
    fn new(file: &'a FileDescriptorProto) -> Self {
        let locations = file
            .source_code_info
            .iter()
            .flat_map(|info| info.location.iter())
            .map(|loc| (loc.path.as_slice(), loc))
            .collect();
        Self { locations }
    }

    fn comments(&self, path: &[i32]) -> (String, String) {
        self.locations
            .get(path)
            .map(|loc| {
                (
                    loc.leading_comments().to_string(),
                    loc.trailing_comments().to_string(),
                )
            })
            .unwrap_or_default()
    }

    fn message(&self, message: &DescriptorProto, scope: &str, path: Vec<i32>) -> MessageContext {
        let full_name = qualify(scope, message.name());
        let (leading_comments, trailing_comments) = self.comments(&path);

        let field = message
            .field
            .iter()
            .enumerate()
            .map(|(i, f)| self.field(f, child_path(&path, MESSAGE_FIELD, i)))
            .collect();
        let nested_type = message
            .nested_type
            .iter()
            .enumerate()
            .map(|(i, m)| self.message(m, &full_name, child_path(&path, MESSAGE_NESTED_TYPE, i)))
            .collect();
        let enum_type = message
            .enum_type
            .iter()
            .enumerate()
            .map(|(i, e)| {
                self.enumeration(e, &full_name, child_path(&path, MESSAGE_ENUM_TYPE, i))
            })
            .collect();
        let extension = message
            .extension
            .iter()
            .enumerate()
            .map(|(i, f)| self.field(f, child_path(&path, MESSAGE_EXTENSION, i)))
            .collect();

        let options = message
            .options
            .as_ref()
            .map(|o| MessageOptionsContext {
                map_entry: o.map_entry(),
                deprecated: o.deprecated(),
            })
            .unwrap_or_default();

        MessageContext {
            name: message.name().to_string(),
            full_name,
            field,
            nested_type,
            enum_type,
            extension,
            oneof_decl: message
                .oneof_decl
                .iter()
                .map(|o| OneofContext {
                    name: o.name().to_string(),
                })
                .collect(),
            reserved_name: message.reserved_name.clone(),
            options,
            leading_comments,
            trailing_comments,
        }
    }

    fn field(&self, field: &FieldDescriptorProto, path: Vec<i32>) -> FieldContext {
        let (leading_comments, trailing_comments) = self.comments(&path);
        let options = field
            .options
            .as_ref()
            .map(|o| FieldOptionsContext {
                deprecated: o.deprecated(),
                packed: o.packed(),
            })
            .unwrap_or_default();

        FieldContext {
            name: field.name().to_string(),
            number: field.number(),
            label: field.label().as_str_name().to_string(),
            field_type: field.r#type().as_str_name().to_string(),
            type_name: field.type_name().to_string(),
            extendee: field.extendee().to_string(),
            default_value: field.default_value().to_string(),
            oneof_index: field.oneof_index,
            json_name: field.json_name().to_string(),
            proto3_optional: field.proto3_optional(),
            options,
            leading_comments,
            trailing_comments,
        }
    }

    fn enumeration(
        &self,
        enumeration: &EnumDescriptorProto,
        scope: &str,
        path: Vec<i32>,
    ) -> EnumContext {
        let (leading_comments, trailing_comments) = self.comments(&path);
        let value = enumeration
            .value
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let (leading_comments, trailing_comments) =
                    self.comments(&child_path(&path, ENUM_VALUE, i));
                EnumValueContext {
                    name: v.name().to_string(),
                    number: v.number(),
                    leading_comments,
                    trailing_comments,
                }
            })
            .collect();
        let options = enumeration
            .options
            .as_ref()
            .map(|o| EnumOptionsContext {
                allow_alias: o.allow_alias(),
                deprecated: o.deprecated(),
            })
            .unwrap_or_default();

        EnumContext {
            name: enumeration.name().to_string(),
            full_name: qualify(scope, enumeration.name()),
            value,
            options,
            leading_comments,
            trailing_comments,
        }
    }

    fn service(&self, service: &ServiceDescriptorProto, path: Vec<i32>) -> ServiceContext {
        let (leading_comments, trailing_comments) = self.comments(&path);
        let method = service
            .method
            .iter()
            .enumerate()
            .map(|(i, m)| self.method(m, child_path(&path, SERVICE_METHOD, i)))
            .collect();

        ServiceContext {
            name: service.name().to_string(),
            method,
            leading_comments,
            trailing_comments,
        }
    }

    fn method(&self, method: &MethodDescriptorProto, path: Vec<i32>) -> MethodContext {
        let (leading_comments, trailing_comments) = self.comments(&path);
        MethodContext {
            name: method.name().to_string(),
            input_type: method.input_type().to_string(),
            output_type: method.output_type().to_string(),
            client_streaming: method.client_streaming(),
            server_streaming: method.server_streaming(),
            leading_comments,
            trailing_comments,
        }
    }
}

fn child_path(parent: &[i32], field_number: i32, index: usize) -> Vec<i32> {
    let mut path = Vec::with_capacity(parent.len() + 2);
    path.extend_from_slice(parent);
    path.push(field_number);
    path.push(index as i32);
    path
}

fn qualify(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}.{name}")
    }
}
