//! Function tools: native async callables exposed to the server-side model.
//!
//! Typed handlers get their parameter schema derived at compile time from
//! the argument struct ([`schemars::JsonSchema`]); dynamic handlers receive
//! the raw argument object and must supply an explicit schema.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use agentlink_core::Error;

use crate::coerce;
use crate::{Tool, ToolContext};

type BoxToolFuture = Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send>>;
type ToolHandler = Arc<dyn Fn(ToolContext, Map<String, Value>) -> BoxToolFuture + Send + Sync>;

/// A tool backed by a native async function.
#[derive(Clone)]
pub struct FunctionTool {
    name: String,
    description: String,
    schema: Value,
    timeout: Duration,
    handler: ToolHandler,
}

impl FunctionTool {
    /// Wrap a typed handler `A -> R`. The parameter schema is derived from
    /// `A`; incoming arguments are coerced against it before
    /// deserialization, so lenient model output ("2" for an integer field)
    /// still lands in the struct. Optional fields use `Option` or
    /// `#[serde(default)]`.
    pub fn typed<A, R, H, Fut>(name: &str, description: &str, handler: H) -> Self
    where
        A: DeserializeOwned + JsonSchema + Send + 'static,
        R: Serialize + Send + 'static,
        H: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        Self::typed_with_context(name, description, move |_ctx: ToolContext, args: A| {
            handler(args)
        })
    }

    /// Like [`FunctionTool::typed`], for handlers that also want the
    /// execution context (cancellation token, session identifiers).
    pub fn typed_with_context<A, R, H, Fut>(name: &str, description: &str, handler: H) -> Self
    where
        A: DeserializeOwned + JsonSchema + Send + 'static,
        R: Serialize + Send + 'static,
        H: Fn(ToolContext, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    {
        let schema = derive_schema::<A>();
        let handler = Arc::new(handler);
        let handler_schema = schema.clone();
        let wrapped: ToolHandler = Arc::new(move |ctx, args| {
            let handler = handler.clone();
            let schema = handler_schema.clone();
            Box::pin(async move {
                let coerced = coerce::coerce_args(&schema, args)?;
                let typed: A = serde_json::from_value(Value::Object(coerced))?;
                let out = handler(ctx, typed).await?;
                Ok(serde_json::to_value(out)?)
            })
        });
        Self {
            name: name.to_string(),
            description: description.to_string(),
            schema,
            timeout: Duration::ZERO,
            handler: wrapped,
        }
    }

    /// Wrap a handler over a raw argument object. The schema cannot be
    /// inferred for a dynamic map, so an explicit object schema is required;
    /// registration fails without one.
    pub fn dynamic<H, Fut>(
        name: &str,
        description: &str,
        schema: Value,
        handler: H,
    ) -> Result<Self, Error>
    where
        H: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Value>> + Send + 'static,
    {
        if !schema
            .as_object()
            .is_some_and(|o| !o.is_empty())
        {
            return Err(Error::Config(format!(
                "function tool {name}: a dynamic-map handler requires an explicit parameters schema"
            )));
        }
        let handler = Arc::new(handler);
        let wrapped: ToolHandler = Arc::new(move |_ctx, args| {
            let handler = handler.clone();
            Box::pin(async move { handler(args).await })
        });
        Ok(Self {
            name: name.to_string(),
            description: description.to_string(),
            schema,
            timeout: Duration::ZERO,
            handler: wrapped,
        })
    }

    /// Replace the schema. An explicit schema always wins over a derived one.
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn parameters_schema(&self) -> Value {
        self.schema.clone()
    }

    async fn execute(&self, args: Map<String, Value>, ctx: &ToolContext) -> anyhow::Result<Value> {
        (self.handler)(ctx.clone(), args).await
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }
}

/// Derive the parameters schema for a typed argument struct: draft-07 with
/// subschemas inlined, stripped of the metadata keys tool schemas never
/// carry.
fn derive_schema<A: JsonSchema>() -> Value {
    let settings = schemars::gen::SchemaSettings::draft07().with(|s| {
        s.inline_subschemas = true;
        s.meta_schema = None;
    });
    let root = settings.into_generator().into_root_schema_for::<A>();
    let mut value = serde_json::to_value(root.schema).expect("schema serializes to JSON");
    if let Some(obj) = value.as_object_mut() {
        obj.remove("title");
    }
    value
}
