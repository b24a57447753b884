use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;

use crate::config::HarnessConfig;
use crate::coordinator::{ActivationId, ColorSource, Coordinator, HookInstaller};
use crate::executor::InteractiveExecutor;
use crate::hook::{self, InstallStateColors, PanicHook};
use crate::theme::color_name;
use crate::view::ViewState;

/// How long headless mode waits for one activation to commit its color
pub const HEADLESS_TIMEOUT: Duration = Duration::from_secs(10);

/// Final state printed by headless mode
pub fn headless_report(view: &ViewState, activations: u32) -> serde_json::Value {
    serde_json::json!({
        "status": view.status().text,
        "color": color_name(view.visual().color),
        "activations": activations,
        "intercepted_panics": hook::intercepted_panics(),
    })
}

/// The interactive side of the harness. Lives on the UI thread.
pub struct App<I: HookInstaller, C: ColorSource> {
    coordinator: Coordinator<I, C>,
    executor: InteractiveExecutor<ViewState>,
    pub view: ViewState,
    pub should_quit: bool,
}

impl App<PanicHook, InstallStateColors> {
    /// Build the app with the bundled panic-hook collaborators
    pub fn from_config(config: &HarnessConfig, runtime: Handle) -> Result<Self> {
        let idle = config.idle_color()?;
        let installer = PanicHook::with_delay(config.install_delay());
        let colors = InstallStateColors {
            idle,
            palette: config.palette()?,
            delay: config.derive_delay(),
        };
        Ok(Self::new(installer, colors, idle, config.log_capacity, runtime))
    }
}

impl<I: HookInstaller, C: ColorSource> App<I, C> {
    pub fn new(
        installer: I,
        colors: C,
        initial_color: ratatui::style::Color,
        log_capacity: usize,
        runtime: Handle,
    ) -> Self {
        let executor = InteractiveExecutor::new();
        let coordinator = Coordinator::new(installer, colors, executor.handle(), runtime);
        let view = ViewState::new(coordinator.subscribe(), initial_color, log_capacity);
        Self {
            coordinator,
            executor,
            view,
            should_quit: false,
        }
    }

    /// The button press
    pub fn activate(&mut self) -> ActivationId {
        let id = self.coordinator.handle_activation();
        self.view.mark_scheduled(id);
        id
    }

    /// Apply commits posted by workers since the last frame
    pub fn tick(&mut self) -> usize {
        self.executor.run_pending(&mut self.view)
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter | KeyCode::Char(' ') => {
                self.activate();
            }
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true
            }
            _ => {}
        }
    }

    /// Activate and keep ticking until this activation's color is committed
    pub async fn activate_and_wait(&mut self, limit: Duration) -> Result<ActivationId> {
        let id = self.activate();
        let deadline = Instant::now() + limit;
        loop {
            self.tick();
            if self.view.visual().activation == Some(id) {
                return Ok(id);
            }
            if Instant::now() >= deadline {
                anyhow::bail!("activation {} did not complete within {:?}", id, limit);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Run `count` activations one after another, each to completion
    pub async fn run_activations(&mut self, count: u32, limit: Duration) -> Result<()> {
        for _ in 0..count {
            self.activate_and_wait(limit).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventKind;
    use ratatui::style::Color;

    struct Fixed;

    impl HookInstaller for Fixed {
        type Outcome = &'static str;
        fn install_hook(&self) -> &'static str {
            "ok"
        }
    }

    impl ColorSource for Fixed {
        fn derive_color(&self) -> Color {
            Color::Yellow
        }
    }

    struct Stuck;

    impl HookInstaller for Stuck {
        type Outcome = &'static str;
        fn install_hook(&self) -> &'static str {
            std::thread::sleep(Duration::from_millis(300));
            "late"
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_enter_and_space_activate() {
        let mut app = App::new(Fixed, Fixed, Color::Blue, 8, Handle::current());

        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::Char(' ')));
        assert_eq!(app.view.in_flight(), 2);

        let deadline = Instant::now() + Duration::from_secs(5);
        while app.view.in_flight() > 0 && Instant::now() < deadline {
            app.tick();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(app.view.in_flight(), 0);
        assert_eq!(app.view.status().text, "ok");
        assert_eq!(app.view.visual().color, Color::Yellow);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_quit_keys() {
        let mut app = App::new(Fixed, Fixed, Color::Blue, 8, Handle::current());
        app.handle_key(key(KeyCode::Char('x')));
        assert!(!app.should_quit);
        app.handle_key(key(KeyCode::Char('q')));
        assert!(app.should_quit);

        let mut app = App::new(Fixed, Fixed, Color::Blue, 8, Handle::current());
        let mut ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        ctrl_c.kind = KeyEventKind::Press;
        app.handle_key(ctrl_c);
        assert!(app.should_quit);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_activate_and_wait() {
        let mut app = App::new(Fixed, Fixed, Color::Blue, 8, Handle::current());
        let id = app.activate_and_wait(Duration::from_secs(5)).await.unwrap();
        assert_eq!(app.view.visual().activation, Some(id));
        assert_eq!(app.view.status().activation, Some(id));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_activate_and_wait_times_out() {
        let mut app = App::new(Stuck, Fixed, Color::Blue, 8, Handle::current());
        let err = app
            .activate_and_wait(Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("did not complete"));
        assert_eq!(app.view.visual().color, Color::Blue);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_headless_run_with_bundled_hook() {
        let config = HarnessConfig::default();
        let mut app = App::from_config(&config, Handle::current()).unwrap();

        app.run_activations(3, Duration::from_secs(5)).await.unwrap();
        assert_eq!(app.view.in_flight(), 0);
        assert!(hook::is_installed());

        let report = headless_report(&app.view, 3);
        let object = report.as_object().unwrap();
        let mut keys: Vec<_> = object.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["activations", "color", "intercepted_panics", "status"]);

        assert_eq!(report["activations"], 3);
        assert!(report["intercepted_panics"].is_u64());

        // Other tests may install first; later attempts report the attempt
        let status = report["status"].as_str().unwrap();
        assert!(
            status == "installed" || status.starts_with("already installed (attempt "),
            "unexpected status {:?}",
            status
        );

        // Hook is in place, so the color comes from the palette, not the idle color
        let color = report["color"].as_str().unwrap();
        assert!(config.palette.iter().any(|c| c == color), "unexpected color {:?}", color);
        assert_ne!(color, config.idle_color);
    }

    #[test]
    fn test_headless_report_shape() {
        let (_tx, rx) = tokio::sync::watch::channel(crate::coordinator::Status {
            text: "installed".to_string(),
            ..Default::default()
        });
        let view = ViewState::new(rx, Color::Rgb(1, 2, 3), 4);

        let report = headless_report(&view, 0);
        assert_eq!(report["status"], "installed");
        assert_eq!(report["color"], "#010203");
        assert_eq!(report["activations"], 0);
    }
}
