//! Scripted browser used by the integration tests
#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use lms_e2e::{Connector, Driver, E2eError, E2eResult, Locator};

fn key(selector: &str) -> String {
    Locator::parse(selector).to_string()
}

/// Values handed out in order; the last one repeats
#[derive(Debug)]
struct Sequence<T: Copy> {
    values: VecDeque<T>,
}

impl<T: Copy> Sequence<T> {
    fn new(values: &[T]) -> Self {
        Self {
            values: values.iter().copied().collect(),
        }
    }

    fn next(&mut self) -> Option<T> {
        if self.values.len() > 1 {
            self.values.pop_front()
        } else {
            self.values.front().copied()
        }
    }
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<String>,
    counts: HashMap<String, Sequence<usize>>,
    visible: HashMap<String, Sequence<bool>>,
    attributes: HashMap<(String, String), String>,
    failing_navigations: usize,
    failing_clicks: HashSet<String>,
    failing_text: HashSet<String>,
    frame_depth: i32,
}

/// In-memory [`Driver`] whose page state is scripted per selector.
///
/// Unscripted selectors are present and visible.
#[derive(Debug, Default)]
pub struct ScriptedDriver {
    state: Mutex<State>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_count(self, selector: &str, counts: &[usize]) -> Self {
        self.state
            .lock()
            .unwrap()
            .counts
            .insert(key(selector), Sequence::new(counts));
        self
    }

    pub fn with_visible(self, selector: &str, visible: &[bool]) -> Self {
        self.state
            .lock()
            .unwrap()
            .visible
            .insert(key(selector), Sequence::new(visible));
        self
    }

    pub fn with_attribute(self, selector: &str, name: &str, value: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .attributes
            .insert((key(selector), name.to_string()), value.to_string());
        self
    }

    /// The next `n` navigations fail at the transport level
    pub fn failing_navigations(self, n: usize) -> Self {
        self.state.lock().unwrap().failing_navigations = n;
        self
    }

    pub fn failing_click(self, selector: &str) -> Self {
        self.state.lock().unwrap().failing_clicks.insert(key(selector));
        self
    }

    pub fn failing_text(self, selector: &str) -> Self {
        self.state.lock().unwrap().failing_text.insert(key(selector));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count_calls(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn clicks_on(&self, selector: &str) -> usize {
        self.count_calls(&format!("click {}", key(selector)))
    }

    pub fn navigations(&self) -> usize {
        self.calls().iter().filter(|c| c.starts_with("navigate ")).count()
    }

    /// Position of the first call equal to `call`
    pub fn position(&self, call: &str) -> Option<usize> {
        self.calls().iter().position(|c| c == call)
    }

    pub fn frame_depth(&self) -> i32 {
        self.state.lock().unwrap().frame_depth
    }

    fn log(&self, call: String) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl Driver for ScriptedDriver {
    async fn navigate(&self, url: &str) -> E2eResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("navigate {}", url));
        if state.failing_navigations > 0 {
            state.failing_navigations -= 1;
            return Err(E2eError::Transport(format!("connection refused: {}", url)));
        }
        Ok(())
    }

    async fn set_window_size(&self, width: u32, height: u32) -> E2eResult<()> {
        self.log(format!("window {}x{}", width, height));
        Ok(())
    }

    async fn click(&self, locator: &Locator) -> E2eResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("click {}", locator));
        if state.failing_clicks.contains(locator.as_str()) {
            return Err(E2eError::Driver(format!("element not interactable: {}", locator)));
        }
        Ok(())
    }

    async fn clear(&self, locator: &Locator) -> E2eResult<()> {
        self.log(format!("clear {}", locator));
        Ok(())
    }

    async fn set_text(&self, locator: &Locator, value: &str) -> E2eResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("set_text {}={}", locator, value));
        if state.failing_text.contains(locator.as_str()) {
            return Err(E2eError::Driver(format!("element not editable: {}", locator)));
        }
        Ok(())
    }

    async fn count(&self, locator: &Locator) -> E2eResult<usize> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("count {}", locator));
        Ok(state
            .counts
            .get_mut(locator.as_str())
            .and_then(Sequence::next)
            .unwrap_or(1))
    }

    async fn is_visible(&self, locator: &Locator) -> E2eResult<bool> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("visible {}", locator));
        Ok(state
            .visible
            .get_mut(locator.as_str())
            .and_then(Sequence::next)
            .unwrap_or(true))
    }

    async fn attribute(&self, locator: &Locator, name: &str) -> E2eResult<Option<String>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("attribute {} {}", locator, name));
        Ok(state
            .attributes
            .get(&(locator.to_string(), name.to_string()))
            .cloned())
    }

    async fn select_by_text(&self, locator: &Locator, text: &str) -> E2eResult<()> {
        self.log(format!("select {}={}", locator, text));
        Ok(())
    }

    async fn enter_frame(&self, index: u16, _wait: Option<Duration>) -> E2eResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("enter_frame {}", index));
        state.frame_depth += 1;
        Ok(())
    }

    async fn leave_frame(&self) -> E2eResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("leave_frame".to_string());
        state.frame_depth -= 1;
        Ok(())
    }

    async fn run_script(&self, _script: &str) -> E2eResult<()> {
        self.log("script".to_string());
        Ok(())
    }
}

/// Hands out a freshly scripted driver per scenario and counts releases
pub struct ScriptedConnector {
    script: Box<dyn Fn() -> ScriptedDriver + Send + Sync>,
    pub connects: AtomicUsize,
    pub releases: AtomicUsize,
}

impl ScriptedConnector {
    pub fn new(script: impl Fn() -> ScriptedDriver + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            connects: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Driver = ScriptedDriver;

    async fn connect(&self) -> E2eResult<ScriptedDriver> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok((self.script)())
    }

    async fn release(&self, driver: ScriptedDriver) -> E2eResult<()> {
        assert_eq!(driver.frame_depth(), 0, "browser released inside a frame");
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
