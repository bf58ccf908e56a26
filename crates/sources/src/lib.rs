//! rg-blocks-sources: Built-in block implementations for rg-blocks.

mod clock;
mod cpu;
mod disk;
mod memory;
pub mod mumble;
mod network;
mod shared;
mod shell;
mod text;

pub use clock::ClockBlock;
pub use cpu::CpuBlock;
pub use disk::DiskBlock;
pub use memory::MemoryBlock;
pub use mumble::MumbleBlock;
pub use network::NetworkBlock;
pub use shell::ShellBlock;
pub use text::TextBlock;

use rg_blocks_core::Registry;

/// Register all built-in blocks with `registry`
pub fn register_all(registry: &mut Registry) {
    registry.register("clock", "Local date and time", clock::build);
    registry.register("cpu", "Global CPU usage", cpu::build);
    registry.register("memory", "System memory (RAM) and swap usage", memory::build);
    registry.register("disk", "Disk usage of a mount point", disk::build);
    registry.register("network", "Network interface traffic", network::build);
    registry.register("mumble", "Latency and user count of a Mumble server", mumble::build);
    registry.register("shell", "Output of a shell command", shell::build);
    registry.register("text", "Static text", text::build);
}
