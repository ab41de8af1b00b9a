#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value, json};

use dnac_runner_host::{Module, SdkClient, SdkError};
use module_core::ModuleDefinition;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub family: String,
    pub method: String,
    pub arguments: Map<String, Value>,
}

/// Scripted SDK double: queue one reply per expected call of
/// `family.method`, record everything the dispatcher sends.
#[derive(Default)]
pub struct FakeSdk {
    replies: Mutex<HashMap<(String, String), VecDeque<Result<Value, SdkError>>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeSdk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, family: &str, method: &str, reply: Result<Value, SdkError>) -> Self {
        self.replies
            .lock()
            .entry((family.to_string(), method.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl SdkClient for FakeSdk {
    fn supports(&self, family: &str, method: &str) -> bool {
        self.replies
            .lock()
            .contains_key(&(family.to_string(), method.to_string()))
    }

    async fn call(
        &self,
        family: &str,
        method: &str,
        arguments: Map<String, Value>,
    ) -> Result<Value, SdkError> {
        self.calls.lock().push(RecordedCall {
            family: family.to_string(),
            method: method.to_string(),
            arguments,
        });
        self.replies
            .lock()
            .get_mut(&(family.to_string(), method.to_string()))
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(SdkError::transport(format!(
                    "no scripted reply for {family}.{method}"
                )))
            })
    }
}

pub fn module_from_json(value: Value) -> Module {
    let definition: ModuleDefinition =
        serde_json::from_value(value).expect("test definition should deserialize");
    Module::new(definition).expect("test definition should build")
}

/// Task arguments with the connection block filled in.
pub fn task_args(extra: Value) -> Value {
    let mut args = json!({
        "dnac_host": "dnac.example.net",
        "dnac_password": "hunter2",
    });
    let map = args.as_object_mut().unwrap();
    for (key, value) in extra.as_object().expect("extra args must be a mapping") {
        map.insert(key.clone(), value.clone());
    }
    args
}
