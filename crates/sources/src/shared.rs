//! Process-wide sysinfo handles.
//!
//! Several blocks of the same type can exist at once (two disks, three
//! interfaces); they all refresh through one instance per concern instead
//! of each holding its own copy of the system tables.

use once_cell::sync::Lazy;
use std::sync::{Mutex, MutexGuard};
use sysinfo::{Disks, Networks, System};

static SHARED_SYSTEM: Lazy<Mutex<System>> = Lazy::new(|| {
    log::info!("Creating shared sysinfo::System instance");
    Mutex::new(System::new())
});

static SHARED_DISKS: Lazy<Mutex<Disks>> = Lazy::new(|| {
    log::info!("Creating shared Disks sysinfo instance");
    Mutex::new(Disks::new_with_refreshed_list())
});

static SHARED_NETWORKS: Lazy<Mutex<Networks>> = Lazy::new(|| {
    log::info!("Creating shared Networks sysinfo instance");
    Mutex::new(Networks::new_with_refreshed_list())
});

fn lock<T>(mutex: &'static Mutex<T>, what: &str) -> anyhow::Result<MutexGuard<'static, T>> {
    mutex
        .lock()
        .map_err(|e| anyhow::anyhow!("{} mutex poisoned: {}", what, e))
}

pub fn system() -> anyhow::Result<MutexGuard<'static, System>> {
    lock(&SHARED_SYSTEM, "System")
}

pub fn disks() -> anyhow::Result<MutexGuard<'static, Disks>> {
    lock(&SHARED_DISKS, "Disks")
}

pub fn networks() -> anyhow::Result<MutexGuard<'static, Networks>> {
    lock(&SHARED_NETWORKS, "Networks")
}
