//! Script steps and the runner that applies them to a [`UiManager`].

use std::{collections::BTreeSet, str::FromStr, time::Duration};

use tokio::{sync::broadcast, time};
use tracing::{debug, info, warn};
use uiwin_core::{Args, UiManager, WindowController, WindowEvent, WindowInfo};

use crate::error::{Error, Result};

/// One scripted manager operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// `open:NAME[:JSON]`
    Open {
        /// Window name.
        name: String,
        /// Open arguments.
        args: Args,
    },
    /// `toggle:NAME[:JSON]`
    Toggle {
        /// Window name.
        name: String,
        /// Open arguments, used when the toggle opens.
        args: Args,
    },
    /// `close:NAME`
    Close(String),
    /// `dynamic:TEMPLATE:INSTANCE[:JSON]`
    Dynamic {
        /// Template window.
        template: String,
        /// Instance name.
        instance: String,
        /// Open arguments.
        args: Args,
    },
    /// `destroy:NAME`
    Destroy(String),
    /// `close-all`
    CloseAll,
    /// `destroy-all`
    DestroyAll,
    /// `wait:DURATION`, e.g. `wait:150ms`.
    Wait(Duration),
}

impl FromStr for Step {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (verb, rest) = s.split_once(':').unwrap_or((s, ""));
        match verb {
            "open" => {
                let (name, args) = name_and_args(s, rest)?;
                Ok(Self::Open { name, args })
            }
            "toggle" => {
                let (name, args) = name_and_args(s, rest)?;
                Ok(Self::Toggle { name, args })
            }
            "close" => Ok(Self::Close(bare_name(s, rest)?)),
            "destroy" => Ok(Self::Destroy(bare_name(s, rest)?)),
            "dynamic" => {
                let (template, rest) = rest
                    .split_once(':')
                    .ok_or_else(|| Error::step(s, "expected dynamic:TEMPLATE:INSTANCE"))?;
                let template = bare_name(s, template)?;
                let (instance, args) = name_and_args(s, rest)?;
                Ok(Self::Dynamic {
                    template,
                    instance,
                    args,
                })
            }
            "close-all" => Ok(Self::CloseAll),
            "destroy-all" => Ok(Self::DestroyAll),
            "wait" => humantime::parse_duration(rest)
                .map(Self::Wait)
                .map_err(|e| Error::step(s, e.to_string())),
            _ => Err(Error::step(s, format!("unknown verb `{verb}`"))),
        }
    }
}

/// Parse `NAME[:JSON]`.
fn name_and_args(step: &str, rest: &str) -> Result<(String, Args)> {
    let (name, json) = match rest.split_once(':') {
        Some((name, json)) => (name, Some(json)),
        None => (rest, None),
    };
    let name = bare_name(step, name)?;
    let args = match json {
        Some(json) => serde_json::from_str::<Args>(json)
            .map_err(|e| Error::step(step, format!("arguments must be a JSON array: {e}")))?,
        None => Args::new(),
    };
    Ok((name, args))
}

/// Parse a non-empty window name.
fn bare_name(step: &str, name: &str) -> Result<String> {
    if name.is_empty() || name.contains(':') {
        return Err(Error::step(step, "expected a window name"));
    }
    Ok(name.to_string())
}

/// Parse every step, failing on the first bad one.
pub fn parse_steps(raw: &[String]) -> Result<Vec<Step>> {
    if raw.is_empty() {
        return Err(Error::NoSteps);
    }
    raw.iter().map(|s| s.parse()).collect()
}

/// Window templates the steps need controllers for.
pub fn templates(steps: &[Step]) -> BTreeSet<String> {
    steps
        .iter()
        .filter_map(|step| match step {
            Step::Open { name, .. } | Step::Toggle { name, .. } => Some(name.clone()),
            Step::Dynamic { template, .. } => Some(template.clone()),
            _ => None,
        })
        .collect()
}

/// Controller that logs its hooks.
#[derive(Debug, Default)]
pub struct ScriptController {
    /// Instance name, known after `on_init`.
    name: String,
}

impl WindowController for ScriptController {
    fn on_init(&mut self, info: &WindowInfo) {
        self.name = info.instance.clone();
        debug!(window = %self.name, template = %info.template, "on_init");
    }

    fn on_open(&mut self, args: &Args) {
        debug!(window = %self.name, args = ?args, "on_open");
    }

    fn on_close(&mut self) {
        debug!(window = %self.name, "on_close");
    }
}

/// Applies steps and collects the event log.
pub struct Runner {
    /// The manager under test.
    ui: UiManager,
    /// Lifecycle event feed.
    events: broadcast::Receiver<WindowEvent>,
    /// Time given to loads after each step.
    settle: Duration,
    /// Names whose load failed.
    failed: Vec<String>,
}

impl Runner {
    /// Runner over `ui`, subscribing to its events now.
    pub fn new(ui: UiManager, settle: Duration) -> Self {
        let events = ui.subscribe();
        Self {
            ui,
            events,
            settle,
            failed: Vec::new(),
        }
    }

    /// Apply one step, give loads time to progress, then print new events.
    pub async fn step(&mut self, step: &Step) {
        info!(?step, "step");
        match step {
            Step::Open { name, args } => {
                self.ui.open(name, args.clone());
            }
            Step::Toggle { name, args } => self.ui.toggle(name, args.clone()),
            Step::Close(name) => self.ui.close(name),
            Step::Dynamic {
                template,
                instance,
                args,
            } => {
                self.ui.open_dynamic(template, instance, args.clone());
            }
            Step::Destroy(name) => self.ui.destroy(name),
            Step::CloseAll => self.ui.close_all(),
            Step::DestroyAll => self.ui.destroy_all(),
            Step::Wait(d) => time::sleep(*d).await,
        }
        time::sleep(self.settle).await;
        self.print_events();
    }

    /// Wait for outstanding loads, up to `timeout`.
    pub async fn drain(&mut self, timeout: Duration) {
        let deadline = time::Instant::now() + timeout;
        while self.ui.loading_count() > 0 && time::Instant::now() < deadline {
            time::sleep(Duration::from_millis(5)).await;
        }
        if self.ui.loading_count() > 0 {
            warn!(loading = self.ui.loading_count(), "loads still in flight at exit");
        }
        self.print_events();
    }

    /// Print and record every event received so far.
    fn print_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    println!("{:<6} {}", event.tag(), event.name());
                    if let WindowEvent::LoadFailed { name, reason } = &event {
                        println!("       {reason}");
                        self.failed.push(name.clone());
                    }
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(missed = n, "event log lagged");
                }
                Err(_) => break,
            }
        }
    }

    /// Final state of every registered window.
    pub fn summary(&self) -> Vec<(String, bool)> {
        self.ui
            .window_names()
            .into_iter()
            .map(|name| {
                let open = self.ui.is_open(&name);
                (name, open)
            })
            .collect()
    }

    /// Names whose load failed during the run.
    pub fn failed(&self) -> &[String] {
        &self.failed
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_every_verb() {
        let raw = [
            "open:Login",
            r#"toggle:Bag:[1,"x"]"#,
            "close:Login",
            "dynamic:Item:Item1:[2]",
            "destroy:Item1",
            "close-all",
            "destroy-all",
            "wait:150ms",
        ]
        .map(String::from);
        let steps = parse_steps(&raw).unwrap();
        assert_eq!(
            steps,
            [
                Step::Open {
                    name: "Login".into(),
                    args: vec![],
                },
                Step::Toggle {
                    name: "Bag".into(),
                    args: vec![json!(1), json!("x")],
                },
                Step::Close("Login".into()),
                Step::Dynamic {
                    template: "Item".into(),
                    instance: "Item1".into(),
                    args: vec![json!(2)],
                },
                Step::Destroy("Item1".into()),
                Step::CloseAll,
                Step::DestroyAll,
                Step::Wait(Duration::from_millis(150)),
            ]
        );
        assert_eq!(
            templates(&steps).into_iter().collect::<Vec<_>>(),
            ["Bag", "Item", "Login"]
        );
    }

    #[test]
    fn json_arguments_may_contain_colons() {
        let step: Step = r#"open:Login:["a:b"]"#.parse().unwrap();
        assert_eq!(
            step,
            Step::Open {
                name: "Login".into(),
                args: vec![json!("a:b")],
            }
        );
    }

    #[test]
    fn rejects_bad_steps() {
        for bad in [
            "open",
            "open:",
            "fly:Login",
            "dynamic:Item",
            "open:Login:{}",
            "wait:soon",
            "close:A:B",
        ] {
            let err = bad.parse::<Step>().unwrap_err();
            assert!(matches!(err, Error::Step { .. }), "{bad}: {err}");
        }
        assert!(matches!(parse_steps(&[]), Err(Error::NoSteps)));
    }
}
