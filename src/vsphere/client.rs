use crate::error::{PccVmError, Result};
use crate::vsphere::types::{
    GuestInfo, ManagedObjectReference, PowerState, ServiceContent, TaskInfo,
    VirtualMachineCloneSpec, VirtualMachineConfigInfo, VirtualMachineRuntimeInfo,
};
use crate::vsphere::Vim;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

const SESSION_HEADER: &str = "vmware-api-session-id";

/// Everything needed to open a session against a vCenter.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub host: String,
    pub user: String,
    pub password: String,
    pub insecure: bool,
    pub api_release: String,
    pub timeout: Duration,
}

/// Blocking session on the vSphere JSON API (`/sdk/vim25/<release>`).
///
/// Properties are read with `GET <base>/<type>/<id>/<property>` and methods
/// invoked with `POST <base>/<type>/<id>/<method>`. The session is logged out
/// when the client is dropped.
pub struct VimClient {
    http: Client,
    base_url: String,
    session_id: String,
    content: ServiceContent,
}

impl VimClient {
    pub fn connect(settings: &ConnectionSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .danger_accept_invalid_certs(settings.insecure)
            .build()?;
        let base_url = base_url(&settings.host, &settings.api_release);

        debug!(%base_url, "fetching service content");
        let response = http
            .get(format!("{}/ServiceInstance/ServiceInstance/content", base_url))
            .send()?;
        let content: ServiceContent = decode(response)?;

        debug!(user = %settings.user, "logging in");
        let response = http
            .post(object_url(&base_url, &content.session_manager, "Login"))
            .json(&json!({
                "userName": settings.user,
                "password": settings.password,
            }))
            .send()?;
        let response = check_status(response)?;
        let session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| PccVmError::Api {
                status: response.status().as_u16(),
                message: "login response did not include a session id".to_string(),
            })?;

        Ok(Self {
            http,
            base_url,
            session_id,
            content,
        })
    }

    fn authed(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(SESSION_HEADER, &self.session_id)
    }

    fn get_property<T: DeserializeOwned>(
        &self,
        obj: &ManagedObjectReference,
        property: &str,
    ) -> Result<T> {
        let url = object_url(&self.base_url, obj, property);
        debug!(%obj, property, "reading property");
        let response = self.authed(self.http.get(url)).send()?;
        decode(response)
    }

    fn invoke<T: DeserializeOwned>(
        &self,
        obj: &ManagedObjectReference,
        method: &str,
        params: &Value,
    ) -> Result<T> {
        let url = object_url(&self.base_url, obj, method);
        debug!(%obj, method, "invoking method");
        let response = self.authed(self.http.post(url)).json(params).send()?;
        decode(response)
    }
}

impl Drop for VimClient {
    fn drop(&mut self) {
        let url = object_url(&self.base_url, &self.content.session_manager, "Logout");
        match self.authed(self.http.post(url)).send() {
            Ok(response) if response.status().is_success() => debug!("logged out"),
            Ok(response) => warn!(status = %response.status(), "logout rejected"),
            Err(e) => warn!(error = %e, "logout failed"),
        }
    }
}

impl Vim for VimClient {
    fn root_folder(&self) -> ManagedObjectReference {
        self.content.root_folder.clone()
    }

    fn child_entities(
        &self,
        folder: &ManagedObjectReference,
    ) -> Result<Vec<ManagedObjectReference>> {
        let children: Option<Vec<ManagedObjectReference>> =
            self.get_property(folder, "childEntity")?;
        Ok(children.unwrap_or_default())
    }

    fn name(&self, obj: &ManagedObjectReference) -> Result<String> {
        self.get_property(obj, "name")
    }

    fn parent(&self, obj: &ManagedObjectReference) -> Result<Option<ManagedObjectReference>> {
        self.get_property(obj, "parent")
    }

    fn vm_folder(&self, datacenter: &ManagedObjectReference) -> Result<ManagedObjectReference> {
        self.get_property(datacenter, "vmFolder")
    }

    fn host_folder(&self, datacenter: &ManagedObjectReference) -> Result<ManagedObjectReference> {
        self.get_property(datacenter, "hostFolder")
    }

    fn resource_pool(
        &self,
        compute_resource: &ManagedObjectReference,
    ) -> Result<ManagedObjectReference> {
        self.get_property(compute_resource, "resourcePool")
    }

    fn is_template(&self, vm: &ManagedObjectReference) -> Result<bool> {
        let config: Option<VirtualMachineConfigInfo> = self.get_property(vm, "config")?;
        Ok(config.map(|c| c.template).unwrap_or(false))
    }

    fn power_state(&self, vm: &ManagedObjectReference) -> Result<PowerState> {
        let runtime: VirtualMachineRuntimeInfo = self.get_property(vm, "runtime")?;
        Ok(runtime.power_state)
    }

    fn guest_hostname(&self, vm: &ManagedObjectReference) -> Result<Option<String>> {
        let guest: Option<GuestInfo> = self.get_property(vm, "guest")?;
        Ok(guest
            .and_then(|g| g.host_name)
            .filter(|name| !name.is_empty()))
    }

    fn clone_vm(
        &self,
        vm: &ManagedObjectReference,
        folder: &ManagedObjectReference,
        name: &str,
        spec: &VirtualMachineCloneSpec,
    ) -> Result<ManagedObjectReference> {
        let params = json!({
            "folder": folder,
            "name": name,
            "spec": spec,
        });
        self.invoke(vm, "CloneVM_Task", &params)
    }

    fn power_on(&self, vm: &ManagedObjectReference) -> Result<ManagedObjectReference> {
        self.invoke(vm, "PowerOnVM_Task", &json!({}))
    }

    fn power_off(&self, vm: &ManagedObjectReference) -> Result<ManagedObjectReference> {
        self.invoke(vm, "PowerOffVM_Task", &json!({}))
    }

    fn destroy(&self, vm: &ManagedObjectReference) -> Result<ManagedObjectReference> {
        self.invoke(vm, "Destroy_Task", &json!({}))
    }

    fn task_info(&self, task: &ManagedObjectReference) -> Result<TaskInfo> {
        self.get_property(task, "info")
    }
}

/// Build the API root from a configured host, which may or may not carry a scheme.
pub fn base_url(host: &str, api_release: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    let root = if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    };
    format!("{}/sdk/vim25/{}", root, api_release)
}

fn object_url(base_url: &str, obj: &ManagedObjectReference, member: &str) -> String {
    format!("{}/{}/{}/{}", base_url, obj.kind, obj.value, member)
}

fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().unwrap_or_default();
    Err(PccVmError::Api {
        status: status.as_u16(),
        message: fault_message(&body),
    })
}

fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = check_status(response)?;
    let body = response.text()?;
    // Unset properties come back as an empty body
    if body.trim().is_empty() {
        return Ok(serde_json::from_value(Value::Null)?);
    }
    Ok(serde_json::from_str(&body)?)
}

/// Pull a readable message out of a fault body, falling back to the raw text.
fn fault_message(body: &str) -> String {
    if let Ok(fault) = serde_json::from_str::<Value>(body) {
        let text = ["message", "localizedMessage", "faultstring"]
            .iter()
            .find_map(|key| fault.get(*key).and_then(Value::as_str));
        let kind = fault.get("_typeName").and_then(Value::as_str);
        match (kind, text) {
            (Some(kind), Some(text)) => return format!("{}: {}", kind, text),
            (Some(kind), None) => return kind.to_string(),
            (None, Some(text)) => return text.to_string(),
            (None, None) => {}
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        "empty response".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}
