//! Service registration: named operation sets collected at startup and
//! validated into a `Handler`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use nexus_core::ServiceDefinition;
use tracing::info;

use super::error::ConfigurationError;
use super::handler::OperationHandler;
use super::router::Handler;

/// Checks a service or operation name, returning the reason it is invalid.
fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("name must not be empty");
    }
    if name.trim() != name {
        return Err("name must not have leading or trailing whitespace");
    }
    if name.chars().any(char::is_control) {
        return Err("name must not contain control characters");
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// A named collection of operation handlers.
///
/// Built once at startup, then handed to a `ServiceRegistry`. A service
/// created from a `ServiceDefinition` is checked against that definition
/// when the registry compiles its handler.
pub struct Service {
    name: String,
    definition: Option<ServiceDefinition>,
    operations: HashMap<String, Arc<dyn OperationHandler>>,
    /// Registration order, for deterministic introspection and logging.
    order: Vec<String>,
}

impl Service {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: None,
            operations: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Creates a service that must implement exactly the operations `definition` declares.
    #[must_use]
    pub fn from_definition(definition: ServiceDefinition) -> Self {
        let mut service = Self::new(definition.name());
        service.definition = Some(definition);
        service
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn definition(&self) -> Option<&ServiceDefinition> {
        self.definition.as_ref()
    }

    /// Register an operation handler.
    ///
    /// # Errors
    ///
    /// Returns `InvalidOperationName` for an empty or malformed name and
    /// `DuplicateOperation` if the name is already taken. An existing
    /// registration is never overwritten.
    pub fn register<H: OperationHandler + 'static>(&mut self, handler: H) -> Result<(), ConfigurationError> {
        let name = handler.name().to_string();
        validate_name(&name).map_err(|reason| ConfigurationError::InvalidOperationName {
            service: self.name.clone(),
            name: name.clone(),
            reason,
        })?;
        if self.operations.contains_key(&name) {
            return Err(ConfigurationError::DuplicateOperation {
                service: self.name.clone(),
                operation: name,
            });
        }
        self.order.push(name.clone());
        self.operations.insert(name, Arc::new(handler));
        Ok(())
    }

    /// Register an operation handler, treating failure as a programming error.
    ///
    /// # Panics
    ///
    /// Panics if [`register`](Self::register) fails.
    pub fn must_register<H: OperationHandler + 'static>(&mut self, handler: H) {
        if let Err(err) = self.register(handler) {
            panic!("{err}");
        }
    }

    #[must_use]
    pub fn operation(&self, name: &str) -> Option<&Arc<dyn OperationHandler>> {
        self.operations.get(name)
    }

    /// Operation names in registration order.
    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Structural checks run when the registry compiles.
    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.operations.is_empty() {
            return Err(ConfigurationError::EmptyService {
                service: self.name.clone(),
            });
        }
        let Some(definition) = &self.definition else {
            return Ok(());
        };
        for declared in definition.operations() {
            let Some(handler) = self.operations.get(&declared.name) else {
                return Err(ConfigurationError::MissingOperation {
                    service: self.name.clone(),
                    operation: declared.name.clone(),
                });
            };
            let actual = handler.descriptor();
            if actual.input != declared.input || actual.output != declared.output {
                return Err(ConfigurationError::OperationTypeMismatch {
                    service: self.name.clone(),
                    operation: declared.name.clone(),
                    expected_input: declared.input,
                    expected_output: declared.output,
                    actual_input: actual.input,
                    actual_output: actual.output,
                });
            }
        }
        if let Some(extra) = self.operation_names().find(|name| definition.find(name).is_none()) {
            return Err(ConfigurationError::UndeclaredOperation {
                service: self.name.clone(),
                operation: extra.to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.name)
            .field("operations", &self.order)
            .field("has_definition", &self.definition.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ServiceRegistry
// ---------------------------------------------------------------------------

/// Collects services during startup and compiles them into a `Handler`.
///
/// Registration is single-threaded and unsynchronized. `new_handler`
/// consumes the registry, so nothing can be registered after compilation.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: HashMap<String, Service>,
    /// Registration order, for deterministic validation and logging.
    order: Vec<String>,
}

impl ServiceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a service.
    ///
    /// # Errors
    ///
    /// Returns `InvalidServiceName` for an empty or malformed name and
    /// `DuplicateService` if the name is already taken.
    pub fn register(&mut self, service: Service) -> Result<(), ConfigurationError> {
        validate_name(service.name()).map_err(|reason| ConfigurationError::InvalidServiceName {
            name: service.name().to_string(),
            reason,
        })?;
        if self.services.contains_key(service.name()) {
            return Err(ConfigurationError::DuplicateService {
                name: service.name().to_string(),
            });
        }
        self.order.push(service.name().to_string());
        self.services.insert(service.name().to_string(), service);
        Ok(())
    }

    /// Register a service, treating failure as a programming error.
    ///
    /// # Panics
    ///
    /// Panics if [`register`](Self::register) fails.
    pub fn must_register(&mut self, service: Service) {
        if let Err(err) = self.register(service) {
            panic!("{err}");
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.services.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Validate every registered service and freeze them into a `Handler`.
    ///
    /// # Errors
    ///
    /// Returns `EmptyRegistry` if nothing was registered, or the first
    /// structural error found in a service (in registration order).
    pub fn new_handler(self) -> Result<Handler, ConfigurationError> {
        if self.services.is_empty() {
            return Err(ConfigurationError::EmptyRegistry);
        }
        for name in &self.order {
            if let Some(service) = self.services.get(name) {
                service.validate()?;
            }
        }
        for name in &self.order {
            if let Some(service) = self.services.get(name) {
                let operations: Vec<&str> = service.operation_names().collect();
                info!(service = %name, operations = ?operations, "service registered");
            }
        }
        Ok(Handler::new(self.services))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
