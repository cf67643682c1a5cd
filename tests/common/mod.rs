#![allow(dead_code)]

use std::sync::Arc;

use engram::config::StorageConfig;
use engram::dispatch::Dispatcher;
use engram::system::MemorySystem;

pub async fn temp_system() -> (tempfile::TempDir, Arc<MemorySystem>) {
    let dir = tempfile::tempdir().unwrap();
    let storage = StorageConfig::with_data_dir(dir.path().to_string_lossy().into_owned());
    let system = Arc::new(MemorySystem::open(storage).await.unwrap());
    (dir, system)
}

pub async fn temp_dispatcher() -> (tempfile::TempDir, Arc<MemorySystem>, Dispatcher) {
    let (dir, system) = temp_system().await;
    let dispatcher = Dispatcher::new(system.clone());
    (dir, system, dispatcher)
}
