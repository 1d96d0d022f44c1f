//! Launching the emulator process (§1: "a shell-out convenience", out of
//! scope beyond this). Kept deliberately thin — no process supervision, no
//! restart policy, just `Command::new` with the ROM path as its argument.

use std::process::Child;

use tracing::info;

/// Start the emulator binary against a ROM path. Returns the child handle so
/// the caller can decide whether to track or detach it; this module does not
/// supervise the process once spawned.
pub fn spawn_emulator(emulator_path: &str, rom_path: &str) -> std::io::Result<Child> {
    info!(emulator_path, rom_path, "launching emulator");
    std::process::Command::new(emulator_path).arg(rom_path).spawn()
}
