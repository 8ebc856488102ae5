//! winapi implementation of the SCM traits and the service dispatcher

use once_cell::sync::OnceCell;
use std::ffi::OsStr;
use std::os::windows::ffi::OsStrExt;
use std::ptr;
use std::sync::mpsc::{self, Sender};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, error};

use winapi::shared::minwindef::{DWORD, HKEY, LPVOID};
use winapi::shared::winerror::{ERROR_CALL_NOT_IMPLEMENTED, ERROR_SUCCESS, NO_ERROR};
use winapi::um::errhandlingapi::GetLastError;
use winapi::um::winnt::{
    KEY_READ, LPWSTR, REG_SZ, SERVICE_AUTO_START, SERVICE_ERROR_NORMAL, SERVICE_WIN32_OWN_PROCESS,
};
use winapi::um::winreg::{RegCloseKey, RegOpenKeyExW, RegQueryValueExW, HKEY_LOCAL_MACHINE};
use winapi::um::winsvc::{
    ChangeServiceConfig2W, CloseServiceHandle, ControlService, CreateServiceW, DeleteService,
    OpenSCManagerW, OpenServiceW, QueryServiceStatus, RegisterServiceCtrlHandlerExW,
    SetServiceStatus, StartServiceCtrlDispatcherW, StartServiceW, SC_ACTION, SC_ACTION_RESTART,
    SC_HANDLE, SC_MANAGER_ALL_ACCESS, SERVICE_ALL_ACCESS, SERVICE_CONFIG_DESCRIPTION,
    SERVICE_CONFIG_FAILURE_ACTIONS, SERVICE_CONTROL_STOP, SERVICE_DESCRIPTIONW,
    SERVICE_FAILURE_ACTIONSW, SERVICE_STATUS, SERVICE_STATUS_HANDLE, SERVICE_TABLE_ENTRYW,
};

use crate::service_managers::windows::entry::{
    self, ControlRequest, ProcessExit, ReportedStatus, StatusReporter,
};
use crate::service_managers::windows::scm::{
    NativeError, RecoveryAction, ScmConnection, ScmService, ServiceControlManager, ServiceSpec,
    ServiceState,
};

const CONTROL_KEY: &str = "SYSTEM\\CurrentControlSet\\Control";
const KILL_TIMEOUT_VALUE: &str = "WaitToKillServiceTimeout";

static SERVICE_NAME: OnceCell<String> = OnceCell::new();
static CONTROL_SENDER: Mutex<Option<Sender<ControlRequest>>> = Mutex::new(None);

fn wide(value: &str) -> Vec<u16> {
    OsStr::new(value)
        .encode_wide()
        .chain(std::iter::once(0))
        .collect()
}

/// `REG_MULTI_SZ`-style list: each entry NUL-terminated, then a final NUL.
fn wide_list(values: &[String]) -> Option<Vec<u16>> {
    if values.is_empty() {
        return None;
    }
    let mut list: Vec<u16> = values.iter().flat_map(|value| wide(value)).collect();
    list.push(0);
    Some(list)
}

fn last_error() -> NativeError {
    let code = unsafe { GetLastError() };
    NativeError::new(
        code,
        std::io::Error::from_raw_os_error(code as i32).to_string(),
    )
}

fn check(ok: i32) -> Result<(), NativeError> {
    if ok == 0 {
        Err(last_error())
    } else {
        Ok(())
    }
}

/// Owned SCM handle, closed on drop.
struct ScHandle(SC_HANDLE);

// SC handles may be used from any thread.
unsafe impl Send for ScHandle {}
unsafe impl Sync for ScHandle {}

impl ScHandle {
    fn open(raw: SC_HANDLE) -> Result<Self, NativeError> {
        if raw.is_null() {
            Err(last_error())
        } else {
            Ok(Self(raw))
        }
    }
}

impl Drop for ScHandle {
    fn drop(&mut self) {
        unsafe {
            CloseServiceHandle(self.0);
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NativeScm;

impl ServiceControlManager for NativeScm {
    fn connect(&self) -> Result<Box<dyn ScmConnection>, NativeError> {
        let handle = ScHandle::open(unsafe {
            OpenSCManagerW(ptr::null(), ptr::null(), SC_MANAGER_ALL_ACCESS)
        })?;
        Ok(Box::new(NativeConnection(handle)))
    }

    fn wait_to_kill_timeout(&self) -> Option<String> {
        read_registry_string(CONTROL_KEY, KILL_TIMEOUT_VALUE)
    }

    fn run_service(&self, name: &str) -> Result<(), NativeError> {
        let _ = SERVICE_NAME.set(name.to_string());
        let service_name = wide(name);
        let table = [
            SERVICE_TABLE_ENTRYW {
                lpServiceName: service_name.as_ptr(),
                lpServiceProc: Some(service_main),
            },
            SERVICE_TABLE_ENTRYW {
                lpServiceName: ptr::null(),
                lpServiceProc: None,
            },
        ];
        check(unsafe { StartServiceCtrlDispatcherW(table.as_ptr()) })
    }
}

struct NativeConnection(ScHandle);

impl ScmConnection for NativeConnection {
    fn open_service(&self, name: &str) -> Result<Box<dyn ScmService>, NativeError> {
        let name = wide(name);
        let handle = ScHandle::open(unsafe {
            OpenServiceW(self.0 .0, name.as_ptr(), SERVICE_ALL_ACCESS)
        })?;
        Ok(Box::new(NativeService(handle)))
    }

    fn create_service(&self, spec: &ServiceSpec) -> Result<Box<dyn ScmService>, NativeError> {
        let name = wide(&spec.name);
        let display_name = wide(&spec.display_name);
        let binary_path = wide(&spec.command_line());
        let dependencies = wide_list(&spec.dependencies);

        let handle = ScHandle::open(unsafe {
            CreateServiceW(
                self.0 .0,
                name.as_ptr(),
                display_name.as_ptr(),
                SERVICE_ALL_ACCESS,
                SERVICE_WIN32_OWN_PROCESS,
                SERVICE_AUTO_START,
                SERVICE_ERROR_NORMAL,
                binary_path.as_ptr(),
                ptr::null(),
                ptr::null_mut(),
                dependencies.as_ref().map_or(ptr::null(), |list| list.as_ptr()),
                ptr::null(),
                ptr::null(),
            )
        })?;
        let service = NativeService(handle);

        if !spec.description.is_empty() {
            if let Err(e) = service.set_description(&spec.description) {
                let _ = service.delete();
                return Err(e);
            }
        }
        Ok(Box::new(service))
    }
}

struct NativeService(ScHandle);

impl NativeService {
    fn set_description(&self, description: &str) -> Result<(), NativeError> {
        let mut text = wide(description);
        let mut info = SERVICE_DESCRIPTIONW {
            lpDescription: text.as_mut_ptr(),
        };
        check(unsafe {
            ChangeServiceConfig2W(
                self.0 .0,
                SERVICE_CONFIG_DESCRIPTION,
                &mut info as *mut _ as LPVOID,
            )
        })
    }
}

impl ScmService for NativeService {
    fn query(&self) -> Result<ServiceState, NativeError> {
        let mut status: SERVICE_STATUS = unsafe { std::mem::zeroed() };
        check(unsafe { QueryServiceStatus(self.0 .0, &mut status) })?;
        Ok(ServiceState::from_raw(status.dwCurrentState))
    }

    fn start(&self) -> Result<(), NativeError> {
        check(unsafe { StartServiceW(self.0 .0, 0, ptr::null_mut()) })
    }

    fn control_stop(&self) -> Result<ServiceState, NativeError> {
        let mut status: SERVICE_STATUS = unsafe { std::mem::zeroed() };
        check(unsafe { ControlService(self.0 .0, SERVICE_CONTROL_STOP, &mut status) })?;
        Ok(ServiceState::from_raw(status.dwCurrentState))
    }

    fn delete(&self) -> Result<(), NativeError> {
        check(unsafe { DeleteService(self.0 .0) })
    }

    fn set_recovery_actions(
        &self,
        actions: &[RecoveryAction],
        reset_period: Duration,
    ) -> Result<(), NativeError> {
        let mut native_actions: Vec<SC_ACTION> = actions
            .iter()
            .map(|action| SC_ACTION {
                Type: SC_ACTION_RESTART,
                Delay: action.delay.as_millis() as DWORD,
            })
            .collect();
        let mut info = SERVICE_FAILURE_ACTIONSW {
            dwResetPeriod: reset_period.as_secs() as DWORD,
            lpRebootMsg: ptr::null_mut(),
            lpCommand: ptr::null_mut(),
            cActions: native_actions.len() as DWORD,
            lpsaActions: native_actions.as_mut_ptr(),
        };
        check(unsafe {
            ChangeServiceConfig2W(
                self.0 .0,
                SERVICE_CONFIG_FAILURE_ACTIONS,
                &mut info as *mut _ as LPVOID,
            )
        })
    }
}

fn read_registry_string(subkey: &str, value: &str) -> Option<String> {
    let subkey = wide(subkey);
    let value = wide(value);
    let mut key: HKEY = ptr::null_mut();

    let opened = unsafe { RegOpenKeyExW(HKEY_LOCAL_MACHINE, subkey.as_ptr(), 0, KEY_READ, &mut key) };
    if opened as u32 != ERROR_SUCCESS {
        debug!(code = opened, "registry key not readable");
        return None;
    }

    let result = query_string_value(key, &value);
    unsafe {
        RegCloseKey(key);
    }
    result
}

fn query_string_value(key: HKEY, value: &[u16]) -> Option<String> {
    let mut kind: DWORD = 0;
    let mut size: DWORD = 0;
    let status = unsafe {
        RegQueryValueExW(
            key,
            value.as_ptr(),
            ptr::null_mut(),
            &mut kind,
            ptr::null_mut(),
            &mut size,
        )
    };
    if status as u32 != ERROR_SUCCESS || kind != REG_SZ {
        return None;
    }

    let mut buffer = vec![0u16; (size as usize + 1) / 2];
    let status = unsafe {
        RegQueryValueExW(
            key,
            value.as_ptr(),
            ptr::null_mut(),
            &mut kind,
            buffer.as_mut_ptr() as *mut u8,
            &mut size,
        )
    };
    if status as u32 != ERROR_SUCCESS {
        return None;
    }

    let len = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
    Some(String::from_utf16_lossy(&buffer[..len]))
}

struct NativeReporter(SERVICE_STATUS_HANDLE);

impl StatusReporter for NativeReporter {
    fn report(&self, status: ReportedStatus) -> Result<(), NativeError> {
        let mut native = SERVICE_STATUS {
            dwServiceType: SERVICE_WIN32_OWN_PROCESS,
            dwCurrentState: status.state.to_raw(),
            dwControlsAccepted: status.accepts.to_raw(),
            dwWin32ExitCode: NO_ERROR,
            dwServiceSpecificExitCode: 0,
            dwCheckPoint: 0,
            dwWaitHint: 0,
        };
        check(unsafe { SetServiceStatus(self.0, &mut native) })
    }
}

unsafe extern "system" fn control_handler(
    control: DWORD,
    _event_type: DWORD,
    _event_data: LPVOID,
    _context: LPVOID,
) -> DWORD {
    let request = ControlRequest::from_raw(control);
    if let ControlRequest::Other(_) = request {
        return ERROR_CALL_NOT_IMPLEMENTED;
    }

    match CONTROL_SENDER.lock() {
        Ok(sender) => {
            if let Some(sender) = sender.as_ref() {
                let _ = sender.send(request);
            }
        }
        Err(_) => error!("control channel lock poisoned"),
    }
    NO_ERROR
}

unsafe extern "system" fn service_main(_argc: DWORD, _argv: *mut LPWSTR) {
    let Some(name) = SERVICE_NAME.get() else {
        error!("service main invoked without a service name");
        return;
    };

    let (sender, requests) = mpsc::channel();
    match CONTROL_SENDER.lock() {
        Ok(mut slot) => *slot = Some(sender),
        Err(_) => {
            error!("control channel lock poisoned");
            return;
        }
    }

    let wide_name = wide(name);
    let handle =
        RegisterServiceCtrlHandlerExW(wide_name.as_ptr(), Some(control_handler), ptr::null_mut());
    if handle.is_null() {
        error!(service = %name, error = %last_error(), "RegisterServiceCtrlHandlerEx failed");
        return;
    }

    if let Err(e) = entry::serve(requests, &NativeReporter(handle), &ProcessExit) {
        error!(service = %name, error = %e, "SetServiceStatus failed");
    }
}
