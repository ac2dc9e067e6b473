#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;

use enum_map::EnumMap;
use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use noise_worklet::{
    ComputeUnit, HostPort, LoadError, LoadFailedMessage, NodeConfig, NoiseNode, NoiseParam,
    QuantumLengths, TriggerMessage, UnitError, UnitFailedMessage, UnitHandle, UnitImports,
    UnitLoader,
};

pub const MEMORY_SLOTS: usize = 4096;
const PARAMETER_BASE: usize = 256;
const PARAMETER_STRIDE: usize = 512;
const OUTPUT_BASE: usize = 2560;
const RELOCATION: usize = 16;

/// Everything a scripted unit saw, shared with the test.
#[derive(Default)]
pub struct Probe {
    pub inits: Vec<u32>,
    pub offset_queries: Vec<(UnitHandle, NoiseParam)>,
    pub lengths: Vec<QuantumLengths>,
    pub received: Vec<EnumMap<NoiseParam, Vec<f32>>>,
}

/// How a scripted unit behaves.
#[derive(Clone)]
pub struct UnitScript {
    pub id: u32,
    pub output: Vec<f32>,
    pub relocate_every_block: bool,
    pub output_offset: Option<u32>,
    pub parameter_offset: Option<u32>,
    pub trap_in_process: bool,
    pub fail_init: bool,
}

impl UnitScript {
    pub fn constant(id: u32, value: f32) -> Self {
        Self::with_output(id, vec![value; 256])
    }

    pub fn with_output(id: u32, output: Vec<f32>) -> Self {
        Self {
            id,
            output,
            relocate_every_block: false,
            output_offset: None,
            parameter_offset: None,
            trap_in_process: false,
            fail_init: false,
        }
    }
}

/// In-memory stand-in for a compiled unit.
pub struct ScriptedUnit {
    script: UnitScript,
    imports: UnitImports,
    memory: Vec<f32>,
    probe: Rc<RefCell<Probe>>,
    blocks: usize,
    trigger_high: bool,
}

impl ScriptedUnit {
    pub fn new(script: UnitScript, imports: UnitImports, probe: Rc<RefCell<Probe>>) -> Self {
        Self {
            script,
            imports,
            memory: vec![0.0; MEMORY_SLOTS],
            probe,
            blocks: 0,
            trigger_high: false,
        }
    }

    pub fn handle(&self) -> UnitHandle {
        UnitHandle::from_raw(1000 + self.script.id * 8)
    }

    fn shift(&self) -> usize {
        if self.script.relocate_every_block && self.blocks % 2 == 1 {
            RELOCATION
        } else {
            0
        }
    }

    pub fn parameter_slot(&self, param: NoiseParam) -> usize {
        let index = NoiseParam::ALL.iter().position(|p| *p == param).unwrap();
        PARAMETER_BASE + index * PARAMETER_STRIDE + self.shift()
    }
}

impl ComputeUnit for ScriptedUnit {
    type Memory = Vec<f32>;

    fn init(&mut self, capacity_hint: u32) -> Result<UnitHandle, UnitError> {
        self.probe.borrow_mut().inits.push(capacity_hint);
        if self.script.fail_init {
            return Err(UnitError::Trap {
                export: "init",
                message: String::from("unreachable"),
            });
        }
        Ok(self.handle())
    }

    fn parameter_offset(
        &mut self,
        handle: UnitHandle,
        param: NoiseParam,
    ) -> Result<u32, UnitError> {
        assert_eq!(handle, self.handle(), "handle from another unit");
        self.probe.borrow_mut().offset_queries.push((handle, param));
        if let Some(offset) = self.script.parameter_offset {
            return Ok(offset);
        }
        Ok((self.parameter_slot(param) * 4) as u32)
    }

    fn process_quantum(
        &mut self,
        handle: UnitHandle,
        lengths: &QuantumLengths,
    ) -> Result<u32, UnitError> {
        assert_eq!(handle, self.handle(), "handle from another unit");
        if self.script.trap_in_process {
            return Err(UnitError::Trap {
                export: "process_quantum",
                message: String::from("memory access out of bounds"),
            });
        }

        let received = EnumMap::from_fn(|param: NoiseParam| {
            let start = self.parameter_slot(param);
            self.memory[start..start + lengths[param] as usize].to_vec()
        });
        for value in received[NoiseParam::NextValueTrigger].iter() {
            let high = *value > 0.0;
            if high != self.trigger_high {
                self.trigger_high = high;
                (self.imports.change)(high);
            }
        }
        {
            let mut probe = self.probe.borrow_mut();
            probe.lengths.push(*lengths);
            probe.received.push(received);
        }

        let output_slot = OUTPUT_BASE + self.shift();
        let output = self.script.output.clone();
        self.memory[output_slot..output_slot + output.len()].copy_from_slice(&output);
        self.blocks += 1;

        Ok(self
            .script
            .output_offset
            .unwrap_or((output_slot * 4) as u32))
    }

    fn memory(&mut self) -> &mut Vec<f32> {
        &mut self.memory
    }
}

/// What the next `instantiate` call does.
pub enum LoadScript {
    Succeed(UnitScript, Rc<RefCell<Probe>>),
    Fail(String),
    Wait(oneshot::Receiver<Result<(UnitScript, Rc<RefCell<Probe>>), LoadError>>),
}

#[derive(Clone, Default)]
pub struct ScriptedLoader {
    scripts: Rc<RefCell<VecDeque<LoadScript>>>,
}

impl ScriptedLoader {
    pub fn push(&self, script: LoadScript) {
        self.scripts.borrow_mut().push_back(script);
    }

    /// Queues a unit that loads straight away and returns its probe.
    pub fn succeed(&self, script: UnitScript) -> Rc<RefCell<Probe>> {
        let probe = Rc::new(RefCell::new(Probe::default()));
        self.push(LoadScript::Succeed(script, probe.clone()));
        probe
    }

    /// Queues a load that completes when the returned sender fires.
    pub fn wait(
        &self,
    ) -> oneshot::Sender<Result<(UnitScript, Rc<RefCell<Probe>>), LoadError>> {
        let (sender, receiver) = oneshot::channel();
        self.push(LoadScript::Wait(receiver));
        sender
    }
}

impl UnitLoader for ScriptedLoader {
    type Unit = ScriptedUnit;

    fn instantiate(
        &self,
        binary: Vec<u8>,
        imports: UnitImports,
    ) -> LocalBoxFuture<'static, Result<ScriptedUnit, LoadError>> {
        assert!(!binary.is_empty(), "empty binary");
        let script = self
            .scripts
            .borrow_mut()
            .pop_front()
            .expect("no load scripted");
        Box::pin(async move {
            let (script, probe) = match script {
                LoadScript::Succeed(script, probe) => (script, probe),
                LoadScript::Fail(cause) => return Err(LoadError::Instantiate(cause)),
                LoadScript::Wait(receiver) => receiver.await.expect("load abandoned")?,
            };
            Ok(ScriptedUnit::new(script, imports, probe))
        })
    }
}

#[derive(Default)]
pub struct PortLog {
    pub triggers: Vec<TriggerMessage>,
    pub failures: Vec<LoadFailedMessage>,
    pub unit_failures: Vec<UnitFailedMessage>,
}

#[derive(Clone, Default)]
pub struct RecordingPort {
    pub log: Rc<RefCell<PortLog>>,
}

impl HostPort for RecordingPort {
    fn post_trigger(&self, message: &TriggerMessage) {
        self.log.borrow_mut().triggers.push(*message);
    }

    fn post_load_failed(&self, message: &LoadFailedMessage) {
        self.log.borrow_mut().failures.push(message.clone());
    }

    fn post_unit_failed(&self, message: &UnitFailedMessage) {
        self.log.borrow_mut().unit_failures.push(message.clone());
    }
}

pub struct Harness {
    pub node: NoiseNode<ScriptedLoader, RecordingPort>,
    pub loader: ScriptedLoader,
    pub port: RecordingPort,
}

impl Harness {
    pub fn new() -> Self {
        let loader = ScriptedLoader::default();
        let port = RecordingPort::default();
        let node = NoiseNode::new(
            loader.clone(),
            port.clone(),
            &NodeConfig::default(),
            Arc::new(|| 0.5),
        );
        Self { node, loader, port }
    }
}

pub const BINARY: &[u8] = b"\0asm\x01\0\0\0";
