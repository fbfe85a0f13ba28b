//! Shared fixtures for the terminal integration tests.
//!
//! [`ScriptedSdk`] accepts every request and records it.  Tests play the part
//! of the reader themselves: they report transaction updates through the
//! captured [`TransactionReporter`]s and post device events through the
//! terminal's [`EventSender`].

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use mpos_core::{AllEnvironmentConfigurations, DeviceError, DeviceInfo, TransactionRequest};
use mpos_terminal::application::payment_sdk::{
    DeviceEvent, EventSender, PaymentSdk, SdkConfig, TransactionReporter,
};
use mpos_terminal::infrastructure::coordinator::{Coordinator, TerminalHandle, TerminalParts};
use mpos_terminal::infrastructure::storage::medium::StorageMedium;
use mpos_terminal::infrastructure::storage::session_store::ConfigStore;
use uuid::Uuid;

#[derive(Default)]
pub struct ScriptedSdk {
    calls: Mutex<Vec<String>>,
    transactions: Mutex<Vec<(TransactionRequest, TransactionReporter)>>,
    configs: Mutex<Vec<SdkConfig>>,
}

impl ScriptedSdk {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    /// Every call received, in order (`"connect_device:DV1"`, …).
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.lock().unwrap().len()
    }

    /// Request and reporter of the `index`-th submitted transaction.
    pub fn transaction(&self, index: usize) -> (TransactionRequest, TransactionReporter) {
        self.transactions.lock().unwrap()[index].clone()
    }

    pub fn last_config(&self) -> Option<SdkConfig> {
        self.configs.lock().unwrap().last().cloned()
    }
}

impl PaymentSdk for ScriptedSdk {
    fn start_scan(&self) -> Result<(), DeviceError> {
        self.record("start_scan");
        Ok(())
    }

    fn connect_device(&self, device_id: &str) -> Result<(), DeviceError> {
        self.record(format!("connect_device:{device_id}"));
        Ok(())
    }

    fn disconnect_device(&self) -> Result<(), DeviceError> {
        self.record("disconnect_device");
        Ok(())
    }

    fn stop_current_operation(&self) {
        self.record("stop_current_operation");
    }

    fn update(&self, config: &SdkConfig) -> Result<(), DeviceError> {
        self.record(format!("update:{}", config.environment));
        self.configs.lock().unwrap().push(config.clone());
        Ok(())
    }

    fn start_transaction(
        &self,
        request: TransactionRequest,
        reporter: TransactionReporter,
    ) -> Result<(), DeviceError> {
        self.record("start_transaction");
        self.transactions.lock().unwrap().push((request, reporter));
        Ok(())
    }
}

pub struct TestTerminal {
    pub handle: TerminalHandle,
    pub sdk: Arc<ScriptedSdk>,
    pub events: EventSender,
}

impl TestTerminal {
    pub async fn start(medium: Arc<dyn StorageMedium>) -> Self {
        Self::start_with_defaults(medium, AllEnvironmentConfigurations::default()).await
    }

    pub async fn start_with_defaults(
        medium: Arc<dyn StorageMedium>,
        defaults: AllEnvironmentConfigurations,
    ) -> Self {
        let sdk = Arc::new(ScriptedSdk::default());
        let (events, inbound) = EventSender::channel();
        let (handle, _task) = Coordinator::spawn(TerminalParts {
            sdk: Arc::clone(&sdk) as Arc<dyn PaymentSdk>,
            events: events.clone(),
            inbound,
            store: ConfigStore::new(medium),
            defaults,
            device_name_prefix: "D135".to_string(),
        })
        .await;
        Self {
            handle,
            sdk,
            events,
        }
    }

    pub fn discover(&self, device_id: &str, name: Option<&str>) {
        self.events.device(DeviceEvent::Discovered(DeviceInfo {
            device_id: device_id.to_string(),
            name: name.map(str::to_string),
        }));
    }

    /// Returns once every event posted before this call has been handled.
    ///
    /// Events share one FIFO channel, so a marker discovery becoming visible
    /// proves everything ahead of it was processed.  The marker is removed
    /// again by closing the device list.
    pub async fn drain_events(&self) {
        let marker = format!("marker-{}", Uuid::new_v4());
        self.discover(&marker, Some("D135-marker"));
        self.handle
            .wait_for(|p| p.discovered_devices.iter().any(|d| d.device_id == marker))
            .await
            .expect("coordinator running");
        self.handle
            .close_device_list()
            .await
            .expect("coordinator running");
    }
}

/// A fresh directory under the system temp dir.
pub fn temp_dir() -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("mpos_it_{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}
