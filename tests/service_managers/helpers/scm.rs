//! In-memory Service Control Manager

use rustle_service::service_managers::windows::{
    NativeError, RecoveryAction, ScmConnection, ScmService, ServiceControlManager, ServiceSpec,
    ServiceState,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

pub const ERROR_ACCESS_DENIED: u32 = 5;
const ERROR_SERVICE_DOES_NOT_EXIST: u32 = 1060;
const ERROR_SERVICE_NOT_ACTIVE: u32 = 1062;

#[derive(Debug, Clone)]
pub struct FakeService {
    pub spec: ServiceSpec,
    pub state: ServiceState,
    pub recovery: Vec<RecoveryAction>,
    pub reset_period: Option<Duration>,
    stop_requested: Option<Instant>,
}

#[derive(Default)]
struct Inner {
    services: HashMap<String, FakeService>,
    calls: Vec<String>,
    /// How long a stop control takes to reach `Stopped`; `None` never stops.
    stop_delay: Option<Duration>,
    kill_timeout: Option<String>,
    connect_error: Option<u32>,
}

/// Clones share state, so a test can keep one handle and give another to the controller.
#[derive(Clone)]
pub struct FakeScm {
    inner: Arc<Mutex<Inner>>,
}

impl FakeScm {
    pub fn new() -> Self {
        let inner = Inner {
            stop_delay: Some(Duration::ZERO),
            ..Default::default()
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    pub fn with_stop_delay(self, delay: Option<Duration>) -> Self {
        self.inner.lock().unwrap().stop_delay = delay;
        self
    }

    pub fn with_kill_timeout(self, raw: &str) -> Self {
        self.inner.lock().unwrap().kill_timeout = Some(raw.to_string());
        self
    }

    pub fn refusing_connections(self, code: u32) -> Self {
        self.inner.lock().unwrap().connect_error = Some(code);
        self
    }

    /// Register an existing service in `state`.
    pub fn with_service(self, name: &str, state: ServiceState) -> Self {
        let spec = ServiceSpec {
            name: name.to_string(),
            display_name: name.to_string(),
            description: format!("{name} server daemon"),
            executable_path: format!("C:\\services\\{name}.exe").into(),
            args: Vec::new(),
            dependencies: Vec::new(),
        };
        self.inner.lock().unwrap().services.insert(
            name.to_string(),
            FakeService {
                spec,
                state,
                recovery: Vec::new(),
                reset_period: None,
                stop_requested: None,
            },
        );
        self
    }

    pub fn service(&self, name: &str) -> Option<FakeService> {
        self.inner.lock().unwrap().services.get(name).cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn calls_named(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }
}

fn error(code: u32) -> NativeError {
    NativeError::new(code, format!("simulated failure {code}"))
}

impl ServiceControlManager for FakeScm {
    fn connect(&self) -> Result<Box<dyn ScmConnection>, NativeError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push("connect".to_string());
        if let Some(code) = inner.connect_error {
            return Err(error(code));
        }
        Ok(Box::new(FakeConnection {
            inner: Arc::clone(&self.inner),
        }))
    }

    fn wait_to_kill_timeout(&self) -> Option<String> {
        self.inner.lock().unwrap().kill_timeout.clone()
    }

    fn run_service(&self, name: &str) -> Result<(), NativeError> {
        self.inner.lock().unwrap().calls.push(format!("run {name}"));
        Ok(())
    }
}

struct FakeConnection {
    inner: Arc<Mutex<Inner>>,
}

impl ScmConnection for FakeConnection {
    fn open_service(&self, name: &str) -> Result<Box<dyn ScmService>, NativeError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push("open".to_string());
        if !inner.services.contains_key(name) {
            return Err(error(ERROR_SERVICE_DOES_NOT_EXIST));
        }
        Ok(Box::new(FakeHandle {
            inner: Arc::clone(&self.inner),
            name: name.to_string(),
        }))
    }

    fn create_service(&self, spec: &ServiceSpec) -> Result<Box<dyn ScmService>, NativeError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push("create".to_string());
        inner.services.insert(
            spec.name.clone(),
            FakeService {
                spec: spec.clone(),
                state: ServiceState::Stopped,
                recovery: Vec::new(),
                reset_period: None,
                stop_requested: None,
            },
        );
        Ok(Box::new(FakeHandle {
            inner: Arc::clone(&self.inner),
            name: spec.name.clone(),
        }))
    }
}

struct FakeHandle {
    inner: Arc<Mutex<Inner>>,
    name: String,
}

impl FakeHandle {
    fn with_service<T>(
        &self,
        call: &str,
        f: impl FnOnce(&mut FakeService, Option<Duration>) -> Result<T, NativeError>,
    ) -> Result<T, NativeError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(call.to_string());
        let stop_delay = inner.stop_delay;
        match inner.services.get_mut(&self.name) {
            Some(service) => f(service, stop_delay),
            None => Err(error(ERROR_SERVICE_DOES_NOT_EXIST)),
        }
    }
}

impl ScmService for FakeHandle {
    fn query(&self) -> Result<ServiceState, NativeError> {
        self.with_service("query", |service, stop_delay| {
            if let (Some(requested), Some(delay)) = (service.stop_requested, stop_delay) {
                if requested.elapsed() >= delay {
                    service.state = ServiceState::Stopped;
                    service.stop_requested = None;
                }
            }
            Ok(service.state)
        })
    }

    fn start(&self) -> Result<(), NativeError> {
        self.with_service("start", |service, _| {
            service.state = ServiceState::Running;
            Ok(())
        })
    }

    fn control_stop(&self) -> Result<ServiceState, NativeError> {
        self.with_service("control_stop", |service, _| {
            if service.state == ServiceState::Stopped {
                return Err(error(ERROR_SERVICE_NOT_ACTIVE));
            }
            service.state = ServiceState::StopPending;
            service.stop_requested = Some(Instant::now());
            Ok(service.state)
        })
    }

    fn delete(&self) -> Result<(), NativeError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push("delete".to_string());
        inner
            .services
            .remove(&self.name)
            .map(|_| ())
            .ok_or_else(|| error(ERROR_SERVICE_DOES_NOT_EXIST))
    }

    fn set_recovery_actions(
        &self,
        actions: &[RecoveryAction],
        reset_period: Duration,
    ) -> Result<(), NativeError> {
        self.with_service("set_recovery_actions", |service, _| {
            service.recovery = actions.to_vec();
            service.reset_period = Some(reset_period);
            Ok(())
        })
    }
}
