//! Bundled collaborators: a process-wide panic hook and a color source that
//! reads whether it is in place.

use ratatui::style::Color;
use std::fmt;
use std::panic;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Once;
use std::time::Duration;

use crate::coordinator::{ColorSource, HookInstaller};

static INSTALL: Once = Once::new();
static INSTALLED: AtomicBool = AtomicBool::new(false);
static ATTEMPTS: AtomicU64 = AtomicU64::new(0);
static INTERCEPTED: AtomicU64 = AtomicU64::new(0);

/// Whether the panic hook has been installed in this process
pub fn is_installed() -> bool {
    INSTALLED.load(Ordering::Acquire)
}

/// Number of install attempts made so far, successful or not
pub fn install_attempts() -> u64 {
    ATTEMPTS.load(Ordering::Acquire)
}

/// Number of panics that went through the hook
pub fn intercepted_panics() -> u64 {
    INTERCEPTED.load(Ordering::Relaxed)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    Installed,
    AlreadyInstalled { attempt: u64 },
}

impl fmt::Display for HookOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookOutcome::Installed => write!(f, "installed"),
            HookOutcome::AlreadyInstalled { attempt } => {
                write!(f, "already installed (attempt {})", attempt)
            }
        }
    }
}

/// Installs a panic hook that counts and logs panics, then hands them on to
/// whatever hook was there before
#[derive(Debug, Clone, Default)]
pub struct PanicHook {
    pub delay: Duration,
}

impl PanicHook {
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay }
    }
}

impl HookInstaller for PanicHook {
    type Outcome = HookOutcome;

    fn install_hook(&self) -> HookOutcome {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        let mut installed_now = false;
        INSTALL.call_once(|| {
            let previous = panic::take_hook();
            panic::set_hook(Box::new(move |info| {
                INTERCEPTED.fetch_add(1, Ordering::Relaxed);
                tracing::error!("panic intercepted: {}", info);
                previous(info);
            }));
            INSTALLED.store(true, Ordering::Release);
            installed_now = true;
        });

        let attempt = ATTEMPTS.fetch_add(1, Ordering::AcqRel) + 1;
        if installed_now {
            tracing::info!("Panic hook installed");
            HookOutcome::Installed
        } else {
            tracing::info!("Panic hook already in place (attempt {})", attempt);
            HookOutcome::AlreadyInstalled { attempt }
        }
    }
}

/// Idle color until the hook is installed, then one palette entry per attempt
#[derive(Debug, Clone)]
pub struct InstallStateColors {
    pub idle: Color,
    pub palette: Vec<Color>,
    pub delay: Duration,
}

impl InstallStateColors {
    fn pick(&self, installed: bool, attempts: u64) -> Color {
        if !installed || attempts == 0 || self.palette.is_empty() {
            return self.idle;
        }
        let index = ((attempts - 1) % self.palette.len() as u64) as usize;
        self.palette[index]
    }
}

impl ColorSource for InstallStateColors {
    fn derive_color(&self) -> Color {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        self.pick(is_installed(), install_attempts())
    }
}
