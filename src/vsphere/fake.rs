//! In-memory [`Vim`] used by unit tests.
//!
//! Objects live in a flat map keyed by reference; tasks complete immediately
//! unless a failure was scripted for the method. Every task-producing call is
//! recorded so tests can assert on the sequence.

use crate::error::{PccVmError, Result};
use crate::vsphere::types::{
    ManagedObjectReference, PowerState, TaskInfo, TaskState, VirtualMachineCloneSpec,
};
use crate::vsphere::Vim;
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone)]
struct FakeObject {
    name: String,
    parent: Option<ManagedObjectReference>,
    children: Vec<ManagedObjectReference>,
    /// `None` models a VM whose config is not available.
    template: Option<bool>,
    power: PowerState,
    vm_folder: Option<ManagedObjectReference>,
    host_folder: Option<ManagedObjectReference>,
    resource_pool: Option<ManagedObjectReference>,
}

impl FakeObject {
    fn named(name: &str, parent: Option<ManagedObjectReference>) -> Self {
        Self {
            name: name.to_string(),
            parent,
            children: Vec::new(),
            template: None,
            power: PowerState::PoweredOff,
            vm_folder: None,
            host_folder: None,
            resource_pool: None,
        }
    }
}

pub struct FakeVim {
    root: ManagedObjectReference,
    next_id: Cell<u32>,
    objects: RefCell<HashMap<ManagedObjectReference, FakeObject>>,
    hostnames: RefCell<HashMap<String, VecDeque<Option<String>>>>,
    task_failures: RefCell<HashMap<String, String>>,
    tasks: RefCell<HashMap<ManagedObjectReference, TaskState>>,
    failure_messages: RefCell<HashMap<ManagedObjectReference, String>>,
    calls: RefCell<Vec<String>>,
    clone_specs: RefCell<Vec<serde_json::Value>>,
}

impl Default for FakeVim {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeVim {
    pub fn new() -> Self {
        let root = ManagedObjectReference::new("Folder", "group-d1");
        let mut objects = HashMap::new();
        objects.insert(root.clone(), FakeObject::named("Datacenters", None));
        Self {
            root,
            next_id: Cell::new(1),
            objects: RefCell::new(objects),
            hostnames: RefCell::new(HashMap::new()),
            task_failures: RefCell::new(HashMap::new()),
            tasks: RefCell::new(HashMap::new()),
            failure_messages: RefCell::new(HashMap::new()),
            calls: RefCell::new(Vec::new()),
            clone_specs: RefCell::new(Vec::new()),
        }
    }

    fn next_ref(&self, kind: &str, prefix: &str) -> ManagedObjectReference {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        ManagedObjectReference::new(kind, format!("{}-{}", prefix, id))
    }

    fn insert(&self, parent: &ManagedObjectReference, obj: ManagedObjectReference, data: FakeObject) {
        let mut objects = self.objects.borrow_mut();
        if let Some(p) = objects.get_mut(parent) {
            p.children.push(obj.clone());
        }
        objects.insert(obj, data);
    }

    pub fn add_folder(&self, parent: &ManagedObjectReference, name: &str) -> ManagedObjectReference {
        let folder = self.next_ref("Folder", "group");
        self.insert(parent, folder.clone(), FakeObject::named(name, Some(parent.clone())));
        folder
    }

    /// Adds a datacenter together with its `vm` and `host` folders.
    pub fn add_datacenter(
        &self,
        parent: &ManagedObjectReference,
        name: &str,
    ) -> ManagedObjectReference {
        let dc = self.next_ref("Datacenter", "datacenter");
        self.insert(parent, dc.clone(), FakeObject::named(name, Some(parent.clone())));

        let vm_folder = self.add_folder(&dc, "vm");
        let host_folder = self.add_folder(&dc, "host");
        let mut objects = self.objects.borrow_mut();
        let data = objects.get_mut(&dc).expect("datacenter just inserted");
        // The datacenter's own folders are not part of childEntity traversal
        data.children.clear();
        data.vm_folder = Some(vm_folder);
        data.host_folder = Some(host_folder);
        dc
    }

    pub fn add_vm(
        &self,
        folder: &ManagedObjectReference,
        name: &str,
        template: bool,
    ) -> ManagedObjectReference {
        let vm = self.next_ref("VirtualMachine", "vm");
        let mut data = FakeObject::named(name, Some(folder.clone()));
        data.template = Some(template);
        self.insert(folder, vm.clone(), data);
        vm
    }

    /// A VM whose `config` property is unset (e.g. still being created).
    pub fn add_vm_without_config(
        &self,
        folder: &ManagedObjectReference,
        name: &str,
    ) -> ManagedObjectReference {
        let vm = self.next_ref("VirtualMachine", "vm");
        self.insert(folder, vm.clone(), FakeObject::named(name, Some(folder.clone())));
        vm
    }

    pub fn add_cluster(
        &self,
        folder: &ManagedObjectReference,
        name: &str,
    ) -> ManagedObjectReference {
        let cluster = self.next_ref("ClusterComputeResource", "domain-c");
        let pool = self.next_ref("ResourcePool", "resgroup");
        let mut data = FakeObject::named(name, Some(folder.clone()));
        data.resource_pool = Some(pool);
        self.insert(folder, cluster.clone(), data);
        cluster
    }

    pub fn set_power(&self, vm: &ManagedObjectReference, power: PowerState) {
        if let Some(data) = self.objects.borrow_mut().get_mut(vm) {
            data.power = power;
        }
    }

    /// Successive values reported by `guest.hostName` for the VM named `vm_name`.
    /// The last value repeats once the script is exhausted.
    pub fn script_hostnames(&self, vm_name: &str, names: &[Option<&str>]) {
        self.hostnames.borrow_mut().insert(
            vm_name.to_string(),
            names.iter().map(|n| n.map(str::to_string)).collect(),
        );
    }

    /// Make every task started by `method` end in error.
    pub fn fail_task(&self, method: &str, message: &str) {
        self.task_failures
            .borrow_mut()
            .insert(method.to_string(), message.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn clone_specs(&self) -> Vec<serde_json::Value> {
        self.clone_specs.borrow().clone()
    }

    pub fn exists(&self, obj: &ManagedObjectReference) -> bool {
        self.objects.borrow().contains_key(obj)
    }

    pub fn power(&self, vm: &ManagedObjectReference) -> PowerState {
        self.objects.borrow()[vm].power
    }

    fn with_object<T>(
        &self,
        obj: &ManagedObjectReference,
        f: impl FnOnce(&FakeObject) -> T,
    ) -> Result<T> {
        self.objects
            .borrow()
            .get(obj)
            .map(f)
            .ok_or_else(|| PccVmError::Api {
                status: 500,
                message: format!("ManagedObjectNotFound: {}", obj),
            })
    }

    fn start_task(&self, method: &str, target: &ManagedObjectReference) -> (ManagedObjectReference, bool) {
        self.calls
            .borrow_mut()
            .push(format!("{} {}", method, target));
        let task = self.next_ref("Task", "task");
        let failure = self.task_failures.borrow().get(method).cloned();
        let ok = failure.is_none();
        match failure {
            Some(message) => {
                self.tasks.borrow_mut().insert(task.clone(), TaskState::Error);
                self.failure_messages
                    .borrow_mut()
                    .insert(task.clone(), message);
            }
            None => {
                self.tasks.borrow_mut().insert(task.clone(), TaskState::Success);
            }
        }
        (task, ok)
    }
}

impl Vim for FakeVim {
    fn root_folder(&self) -> ManagedObjectReference {
        self.root.clone()
    }

    fn child_entities(
        &self,
        folder: &ManagedObjectReference,
    ) -> Result<Vec<ManagedObjectReference>> {
        self.with_object(folder, |o| o.children.clone())
    }

    fn name(&self, obj: &ManagedObjectReference) -> Result<String> {
        self.with_object(obj, |o| o.name.clone())
    }

    fn parent(&self, obj: &ManagedObjectReference) -> Result<Option<ManagedObjectReference>> {
        self.with_object(obj, |o| o.parent.clone())
    }

    fn vm_folder(&self, datacenter: &ManagedObjectReference) -> Result<ManagedObjectReference> {
        self.with_object(datacenter, |o| o.vm_folder.clone())?
            .ok_or_else(|| PccVmError::Api {
                status: 500,
                message: format!("{} has no vmFolder", datacenter),
            })
    }

    fn host_folder(&self, datacenter: &ManagedObjectReference) -> Result<ManagedObjectReference> {
        self.with_object(datacenter, |o| o.host_folder.clone())?
            .ok_or_else(|| PccVmError::Api {
                status: 500,
                message: format!("{} has no hostFolder", datacenter),
            })
    }

    fn resource_pool(
        &self,
        compute_resource: &ManagedObjectReference,
    ) -> Result<ManagedObjectReference> {
        self.with_object(compute_resource, |o| o.resource_pool.clone())?
            .ok_or_else(|| PccVmError::Api {
                status: 500,
                message: format!("{} has no resourcePool", compute_resource),
            })
    }

    fn is_template(&self, vm: &ManagedObjectReference) -> Result<bool> {
        self.with_object(vm, |o| o.template.unwrap_or(false))
    }

    fn power_state(&self, vm: &ManagedObjectReference) -> Result<PowerState> {
        self.with_object(vm, |o| o.power)
    }

    fn guest_hostname(&self, vm: &ManagedObjectReference) -> Result<Option<String>> {
        let name = self.name(vm)?;
        let mut scripts = self.hostnames.borrow_mut();
        Ok(match scripts.get_mut(&name) {
            Some(queue) if queue.len() > 1 => queue.pop_front().flatten(),
            Some(queue) => queue.front().cloned().flatten(),
            None => None,
        })
    }

    fn clone_vm(
        &self,
        vm: &ManagedObjectReference,
        folder: &ManagedObjectReference,
        name: &str,
        spec: &VirtualMachineCloneSpec,
    ) -> Result<ManagedObjectReference> {
        self.clone_specs.borrow_mut().push(serde_json::to_value(spec)?);
        let (task, ok) = self.start_task("CloneVM_Task", vm);
        if ok {
            let clone = self.add_vm(folder, name, spec.template);
            self.set_power(
                &clone,
                if spec.power_on {
                    PowerState::PoweredOn
                } else {
                    PowerState::PoweredOff
                },
            );
        }
        Ok(task)
    }

    fn power_on(&self, vm: &ManagedObjectReference) -> Result<ManagedObjectReference> {
        let (task, ok) = self.start_task("PowerOnVM_Task", vm);
        if ok {
            self.set_power(vm, PowerState::PoweredOn);
        }
        Ok(task)
    }

    fn power_off(&self, vm: &ManagedObjectReference) -> Result<ManagedObjectReference> {
        let (task, ok) = self.start_task("PowerOffVM_Task", vm);
        if ok {
            self.set_power(vm, PowerState::PoweredOff);
        }
        Ok(task)
    }

    fn destroy(&self, vm: &ManagedObjectReference) -> Result<ManagedObjectReference> {
        let (task, ok) = self.start_task("Destroy_Task", vm);
        if ok {
            let mut objects = self.objects.borrow_mut();
            if let Some(parent) = objects.remove(vm).and_then(|o| o.parent) {
                if let Some(p) = objects.get_mut(&parent) {
                    p.children.retain(|c| c != vm);
                }
            }
        }
        Ok(task)
    }

    fn task_info(&self, task: &ManagedObjectReference) -> Result<TaskInfo> {
        let state = self
            .tasks
            .borrow()
            .get(task)
            .copied()
            .unwrap_or(TaskState::Running);
        let error = self
            .failure_messages
            .borrow()
            .get(task)
            .map(|message| crate::vsphere::types::LocalizedMethodFault {
                localized_message: Some(message.clone()),
            });
        Ok(TaskInfo { state, error })
    }
}
