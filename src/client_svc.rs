//! The legacy `/_vti_bin/client.svc/ProcessQuery` protocol.
//!
//! A ProcessQuery request is an XML document describing a batch of actions
//! (method calls, object path materialisations, queries) against object paths
//! (identities, constructors). The response is a JSON array whose entries are
//! positional:
//!
//! - index 0 is always a [`ClientSvcResponseContents`] with the outcome of the
//!   batch; a non-null `ErrorInfo` there means the batch failed.
//! - later entries are action ids followed by the result of that action, so
//!   callers that need a result pick it by position.
//!
//! [`RequestEnvelope`] builds the request side, [`ClientSvcResponse`] decodes
//! the response side.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, SpoError};

/// `SchemaVersion` attribute sent with every request.
pub const SCHEMA_VERSION: &str = "15.0.0.0";

/// `LibraryVersion` attribute sent with every request.
pub const LIBRARY_VERSION: &str = "16.0.0.0";

/// XML namespace of the client query schema.
pub const CLIENT_QUERY_NAMESPACE: &str = "http://schemas.microsoft.com/sharepoint/clientquery/2009";

/// `ApplicationName` attribute; shows up in SharePoint's ULS logs.
pub const APPLICATION_NAME: &str = concat!("spo-cli v", env!("CARGO_PKG_VERSION"));

/// Type id of `Microsoft.Online.SharePoint.TenantAdministration.Tenant`.
pub const TENANT_TYPE_ID: &str = "{268004ae-ef6b-4e9b-8425-127220d84719}";

// ── Response side ──────────────────────────────────────────────────────

/// Server-side error description carried in `ErrorInfo`.
///
/// Every field is optional on the wire; an `ErrorInfo` object of any shape
/// still marks the batch as failed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorDetail {
    /// Human-readable cause of the failure.
    #[serde(default)]
    pub error_message: String,
    /// Numeric HRESULT-style code.
    #[serde(default)]
    pub error_code: Option<i64>,
    /// .NET exception type name on the server.
    #[serde(default)]
    pub error_type_name: Option<String>,
    /// Extra error value some failures carry.
    #[serde(default)]
    pub error_value: Option<Value>,
    /// Correlation id for the failing request.
    #[serde(default)]
    pub trace_correlation_id: Option<String>,
}

/// Entry 0 of every ProcessQuery response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClientSvcResponseContents {
    /// Present and non-null when the batch failed.
    #[serde(default)]
    pub error_info: Option<ErrorDetail>,
    /// Schema version the server answered with.
    #[serde(default)]
    pub schema_version: Option<String>,
    /// Library version the server answered with.
    #[serde(default)]
    pub library_version: Option<String>,
    /// Correlation id for the whole batch.
    #[serde(default)]
    pub trace_correlation_id: Option<String>,
}

/// A decoded ProcessQuery response: an ordered, non-empty list of entries.
///
/// Entry shapes are not validated beyond entry 0, which is only decoded when
/// asked for via [`contents`](Self::contents) or [`check`](Self::check).
#[derive(Debug, Clone)]
pub struct ClientSvcResponse {
    entries: Vec<Value>,
}

impl ClientSvcResponse {
    /// Parses a raw ProcessQuery body.
    ///
    /// # Errors
    ///
    /// `SpoError::Parse` if the body is not valid JSON, not an array, or an
    /// empty array.
    pub fn parse(body: &str) -> Result<Self> {
        let entries: Vec<Value> = serde_json::from_str(body)?;
        if entries.is_empty() {
            return Err(SpoError::Parse(serde::de::Error::custom(
                "ProcessQuery returned an empty array",
            )));
        }
        Ok(ClientSvcResponse { entries })
    }

    /// Decodes entry 0.
    pub fn contents(&self) -> Result<ClientSvcResponseContents> {
        Ok(ClientSvcResponseContents::deserialize(&self.entries[0])?)
    }

    /// Returns the `ErrorInfo` of entry 0, if the batch failed.
    pub fn error(&self) -> Result<Option<ErrorDetail>> {
        Ok(self.contents()?.error_info)
    }

    /// Turns a reported `ErrorInfo` into `SpoError::Remote`; `Ok(())` when
    /// the batch succeeded.
    ///
    /// Works on the raw entry: any non-null `ErrorInfo` is a failure, even
    /// when its fields do not decode.
    pub fn check(&self) -> Result<()> {
        let info = match self.entries[0].get("ErrorInfo") {
            None | Some(Value::Null) => return Ok(()),
            Some(info) => info,
        };

        let detail = ErrorDetail::deserialize(info).unwrap_or_default();
        let message = if detail.error_message.is_empty() {
            match detail.error_code {
                Some(code) => format!("ProcessQuery reported error {code}"),
                None => "ProcessQuery reported an error".to_string(),
            }
        } else {
            detail.error_message
        };
        Err(SpoError::Remote {
            message,
            type_name: detail.error_type_name,
            code: detail.error_code,
        })
    }

    /// Entry at `index`, if present.
    pub fn entry(&self, index: usize) -> Option<&Value> {
        self.entries.get(index)
    }

    /// The last entry. Always exists since the response is non-empty.
    pub fn last(&self) -> &Value {
        &self.entries[self.entries.len() - 1]
    }
}

// ── Request side ───────────────────────────────────────────────────────

/// A typed `<Parameter>` of a method call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parameter {
    /// `Type="Enum"`, serialized as the numeric value.
    Enum(i64),
    /// `Type="String"`, XML-escaped.
    String(String),
    /// `Type="Boolean"`, `true`/`false`.
    Boolean(bool),
}

impl Parameter {
    fn write(&self, out: &mut String) {
        let (kind, value) = match self {
            Parameter::Enum(v) => ("Enum", v.to_string()),
            Parameter::String(s) => ("String", escape_xml(s)),
            Parameter::Boolean(b) => ("Boolean", b.to_string()),
        };
        out.push_str(&format!(r#"<Parameter Type="{kind}">{value}</Parameter>"#));
    }
}

/// One entry of `<Actions>`.
#[derive(Debug, Clone)]
pub enum Action {
    /// Invoke `name` on the object at `object_path_id`.
    Method {
        /// Method name, e.g. `RemoveTenantCdnOrigin`.
        name: String,
        /// Action id, echoed back in the response.
        id: u32,
        /// Target object path.
        object_path_id: u32,
        /// Ordered parameters.
        parameters: Vec<Parameter>,
    },
    /// Materialise the object at `object_path_id`.
    ObjectPath {
        /// Action id.
        id: u32,
        /// Object path to materialise.
        object_path_id: u32,
    },
    /// Load every scalar property of the object at `object_path_id`.
    QueryAllProperties {
        /// Action id.
        id: u32,
        /// Object path to query.
        object_path_id: u32,
    },
}

impl Action {
    fn write(&self, out: &mut String) {
        match self {
            Action::Method {
                name,
                id,
                object_path_id,
                parameters,
            } => {
                out.push_str(&format!(
                    r#"<Method Name="{}" Id="{id}" ObjectPathId="{object_path_id}">"#,
                    escape_xml_attribute(name)
                ));
                if !parameters.is_empty() {
                    out.push_str("<Parameters>");
                    for p in parameters {
                        p.write(out);
                    }
                    out.push_str("</Parameters>");
                }
                out.push_str("</Method>");
            }
            Action::ObjectPath { id, object_path_id } => {
                out.push_str(&format!(
                    r#"<ObjectPath Id="{id}" ObjectPathId="{object_path_id}" />"#
                ));
            }
            Action::QueryAllProperties { id, object_path_id } => {
                out.push_str(&format!(
                    r#"<Query Id="{id}" ObjectPathId="{object_path_id}"><Query SelectAllProperties="true"><Properties /></Query></Query>"#
                ));
            }
        }
    }
}

/// One entry of `<ObjectPaths>`.
#[derive(Debug, Clone)]
pub enum ObjectPath {
    /// An existing object addressed by its server identity string.
    Identity {
        /// Object path id referenced by actions.
        id: u32,
        /// Server identity (e.g. the tenant `_ObjectIdentity_`).
        name: String,
    },
    /// A new object built from a client type id.
    Constructor {
        /// Object path id referenced by actions.
        id: u32,
        /// Client type id in braces.
        type_id: String,
    },
    /// The tenant object, whose identity is filled in by
    /// [`RequestEnvelope::bind_tenant`] before sending.
    Tenant {
        /// Object path id referenced by actions.
        id: u32,
    },
}

impl ObjectPath {
    fn write(&self, out: &mut String) {
        match self {
            ObjectPath::Identity { id, name } => {
                out.push_str(&format!(
                    r#"<Identity Id="{id}" Name="{}" />"#,
                    escape_xml_attribute(name)
                ));
            }
            ObjectPath::Tenant { id } => {
                out.push_str(&format!(r#"<Identity Id="{id}" Name="" />"#));
            }
            ObjectPath::Constructor { id, type_id } => {
                out.push_str(&format!(
                    r#"<Constructor Id="{id}" TypeId="{}" />"#,
                    escape_xml_attribute(type_id)
                ));
            }
        }
    }
}

/// Builder for the ProcessQuery `<Request>` document.
#[derive(Debug, Clone, Default)]
pub struct RequestEnvelope {
    actions: Vec<Action>,
    object_paths: Vec<ObjectPath>,
}

impl RequestEnvelope {
    /// An empty envelope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an action.
    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Appends an object path.
    pub fn object_path(mut self, path: ObjectPath) -> Self {
        self.object_paths.push(path);
        self
    }

    /// `true` while a [`ObjectPath::Tenant`] placeholder is unbound.
    pub fn needs_tenant(&self) -> bool {
        self.object_paths
            .iter()
            .any(|p| matches!(p, ObjectPath::Tenant { .. }))
    }

    /// Replaces every tenant placeholder with an identity path named
    /// `tenant_id`.
    pub fn bind_tenant(mut self, tenant_id: &str) -> Self {
        for path in &mut self.object_paths {
            if let ObjectPath::Tenant { id } = *path {
                *path = ObjectPath::Identity {
                    id,
                    name: tenant_id.to_string(),
                };
            }
        }
        self
    }

    /// Renders the XML body.
    pub fn to_xml(&self) -> String {
        let mut out = format!(
            r#"<Request AddExpandoFieldTypeSuffix="true" SchemaVersion="{SCHEMA_VERSION}" LibraryVersion="{LIBRARY_VERSION}" ApplicationName="{}" xmlns="{CLIENT_QUERY_NAMESPACE}">"#,
            escape_xml_attribute(APPLICATION_NAME)
        );
        out.push_str("<Actions>");
        for action in &self.actions {
            action.write(&mut out);
        }
        out.push_str("</Actions><ObjectPaths>");
        for path in &self.object_paths {
            path.write(&mut out);
        }
        out.push_str("</ObjectPaths></Request>");
        out
    }
}

/// Envelope that constructs the tenant object and loads its properties.
/// The tenant identity is read from the last response entry.
pub fn tenant_identity_query() -> RequestEnvelope {
    RequestEnvelope::new()
        .action(Action::ObjectPath {
            id: 4,
            object_path_id: 3,
        })
        .action(Action::QueryAllProperties {
            id: 5,
            object_path_id: 3,
        })
        .object_path(ObjectPath::Constructor {
            id: 3,
            type_id: TENANT_TYPE_ID.to_string(),
        })
}

/// Extracts the tenant `_ObjectIdentity_` from a [`tenant_identity_query`]
/// response.
pub fn tenant_identity(response: &ClientSvcResponse) -> Result<String> {
    response.check()?;
    response
        .last()
        .get("_ObjectIdentity_")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| {
            SpoError::UnexpectedResponse("tenant response has no _ObjectIdentity_".to_string())
        })
}

/// Escapes the five XML special characters in element content.
pub fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Like [`escape_xml`], plus line feeds as `&#xA;` so attribute
/// normalisation does not turn them into spaces.
pub fn escape_xml_attribute(s: &str) -> String {
    escape_xml(s).replace('\n', "&#xA;")
}
