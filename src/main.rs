// SPDX-License-Identifier: MIT
//
// weft demo: a small chat-style screen driven by the whole pipeline.
//
//   weft-term → terminal modes, input decoding, event loop, diff flush
//   weft-ui   → node tree, reconcile, layout, paint, focus, history
//
// Every frame the app builds a fresh tree and commits it to the runtime,
// which reconciles it into the retained tree before layout and paint:
//
//   input → on_input → state mutation
//   paint → build → commit (diff + apply) → layout → render_tree → flush
//
// Layout:
//
//   ╭───────────────────────────────────────╮
//   │ weft  12:34:56                        │  ← header, 3 rows
//   ╰───────────────────────────────────────╯
//   ┌───────────────────────────────────────┐
//   │ messages (windowed by VirtualList)    │  ← grows
//   └───────────────────────────────────────┘
//   ┌───────────────────────────────────────┐
//   │ > input line                          │  ← 3 rows, Up/Down history
//   └───────────────────────────────────────┘
//   ┌ clear ┐┌ quit ┐                          ← 3 rows, focusable
//
// Logging goes to `weft.log`, filtered by `WEFT_LOG` (default `warn`).
// `--record <path>` writes an asciicast v2 recording of the session.

use std::env;
use std::fs::File;
use std::process;
use std::rc::Rc;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use weft_term::ansi::CursorShape;
use weft_term::buffer::FrameBuffer;
use weft_term::color::Rgb;
use weft_term::event_loop::{Action, App, EventLoop, LoopControl, TimerId};
use weft_term::input::{InputEvent, KeyEvent, MouseButton, MouseKind, SpecialKeys};
use weft_term::record::{FileRecorder, RecordConfig};
use weft_term::terminal::Size;
use weft_term::width::{graphemes, string_width};

use weft_ui::history::InputHistory;
use weft_ui::runtime::Runtime;
use weft_ui::style::{Border, BorderStyle, Dimension, FlexDirection, LayoutProperty, Style, WrapMode};
use weft_ui::virtual_list::VirtualList;
use weft_ui::{Dom, NodeId};

// ─── Constants ──────────────────────────────────────────────────────────────

const HISTORY_CAPACITY: usize = 100;

/// Rows taken by everything except the message area's interior.
const CHROME_ROWS: u16 = 3 + 2 + 3 + 3;

const ACCENT: Rgb = Rgb::new(0x7a, 0xa2, 0xf7);
const DIM: Rgb = Rgb::new(0x56, 0x5f, 0x89);

const INPUT_ID: &str = "input";
const CLEAR_ID: &str = "clear";
const QUIT_ID: &str = "quit";

// ─── Chat ───────────────────────────────────────────────────────────────────

/// Demo application state. The node tree is rebuilt from this on every
/// paint.
struct Chat {
    runtime: Runtime,
    messages: Vec<String>,
    list: VirtualList,
    input: String,
    history: InputHistory,
    clock: String,
    clock_timer: Option<TimerId>,
    size: Size,
}

impl Chat {
    fn new(size: Size) -> weft_ui::Result<Self> {
        let mut chat = Self {
            runtime: Runtime::new(),
            messages: Vec::new(),
            list: VirtualList::new(0, 1, viewport_rows(size), 0),
            input: String::new(),
            history: InputHistory::new(HISTORY_CAPACITY)?,
            clock: clock_now(),
            clock_timer: None,
            size,
        };
        chat.push_message("weft: Tab moves focus, Enter sends, Esc quits");
        Ok(chat)
    }

    fn push_message(&mut self, text: impl Into<String>) {
        let follow = self.list.is_at_bottom();
        self.messages.push(text.into());
        self.list.set_count(self.messages.len());
        if follow {
            self.list.scroll_bottom();
        }
    }

    fn focused_id(&self) -> Option<&str> {
        let node = self.runtime.focus().focused()?;
        self.runtime.dom().get(node)?.id.as_deref()
    }

    // ── Input ──

    fn submit(&mut self) {
        let line = std::mem::take(&mut self.input);
        if line.trim().is_empty() {
            return;
        }
        self.history.add_unique(line.as_str());
        self.push_message(line);
        self.list.scroll_bottom();
    }

    fn activate(&mut self) -> Action {
        match self.focused_id() {
            Some(QUIT_ID) => return Action::Quit,
            Some(CLEAR_ID) => {
                self.messages.clear();
                self.list.set_count(0);
            }
            _ => self.submit(),
        }
        Action::Continue
    }

    fn recall_prev(&mut self) {
        if !self.history.is_navigating() {
            self.history.save_temp(self.input.as_str());
        }
        if let Some(entry) = self.history.prev() {
            self.input = entry.to_owned();
        }
    }

    fn recall_next(&mut self) {
        if !self.history.is_navigating() {
            return;
        }
        self.input = match self.history.next() {
            Some(entry) => entry.to_owned(),
            None => self.history.get_temp().unwrap_or_default().to_owned(),
        };
    }

    fn backspace(&mut self) {
        if let Some(last) = graphemes(&self.input).last() {
            let cut = self.input.len() - last.len();
            self.input.truncate(cut);
        }
    }

    fn type_text(&mut self, text: &str) {
        self.history.reset_navigation();
        self.input.extend(text.chars().filter(|c| !c.is_control()));
    }

    fn on_key(&mut self, key: &KeyEvent) -> Action {
        if key.escape() || key.is_ctrl('c') {
            return Action::Quit;
        }
        let in_input = self.focused_id() == Some(INPUT_ID);
        if key.enter() {
            return self.activate();
        }
        if key.special.contains(SpecialKeys::PAGE_UP) {
            self.list.page_up();
        } else if key.special.contains(SpecialKeys::PAGE_DOWN) {
            self.list.page_down();
        } else if key.up_arrow() && in_input {
            self.recall_prev();
        } else if key.down_arrow() && in_input {
            self.recall_next();
        } else if key.backspace() && in_input {
            self.backspace();
        } else if in_input && !key.ctrl() && !key.meta() && key.special.is_empty() {
            if let Some(text) = key.text.as_str() {
                self.type_text(text);
            }
        }
        Action::Continue
    }

    // ── Frame ──

    /// Describe the screen as a fresh subtree of the runtime's tree.
    fn build(&mut self) -> weft_ui::Result<NodeId> {
        let focused = self.focused_id().map(str::to_owned);
        let dom = self.runtime.dom_mut();

        let root = dom.create_box()?;
        dom.set_flex_direction(root, FlexDirection::Column)?;

        let header = framed(dom, root, BorderStyle::Round, 3.0)?;
        let clock = format!("weft  {}", self.clock);
        text(dom, header, &clock, Style::default().fg(ACCENT))?;

        let log = dom.create_box()?;
        dom.set_border(log, Border::new(BorderStyle::Single).color(DIM))?;
        dom.set_flex_direction(log, FlexDirection::Column)?;
        dom.set_layout_property(log, LayoutProperty::FlexGrow, Dimension::Cells(1.0))?;
        dom.append_child(root, log)?;
        for i in self.list.visible_range() {
            let line = text(dom, log, &self.messages[i], Style::default())?;
            dom.set_key(line, Some(Rc::from(format!("m{i}"))))?;
            dom.set_wrap(line, WrapMode::None)?;
        }

        let input = field(dom, root, INPUT_ID, focused.as_deref())?;
        dom.set_auto_focus(input, true)?;
        text(dom, input, &format!("> {}", self.input), Style::default())?;

        let buttons = dom.create_box()?;
        dom.set_flex_direction(buttons, FlexDirection::Row)?;
        dom.set_layout_property(buttons, LayoutProperty::Height, Dimension::Cells(3.0))?;
        dom.append_child(root, buttons)?;
        for id in [CLEAR_ID, QUIT_ID] {
            let button = field(dom, buttons, id, focused.as_deref())?;
            dom.set_layout_property(button, LayoutProperty::Width, Dimension::Cells(9.0))?;
            text(dom, button, &format!(" {id}"), Style::default())?;
        }

        Ok(root)
    }

    fn frame(&mut self) -> weft_ui::Result<()> {
        let root = self.build()?;
        let stats = self.runtime.commit(root)?;
        debug!(?stats, "frame committed");
        self.runtime.layout(self.size.cols, self.size.rows)
    }
}

/// A bordered box of fixed `height` appended to `parent`.
fn framed(dom: &mut Dom, parent: NodeId, style: BorderStyle, height: f32) -> weft_ui::Result<NodeId> {
    let node = dom.create_box()?;
    dom.set_border(node, Border::new(style).color(DIM))?;
    dom.set_layout_property(node, LayoutProperty::Height, Dimension::Cells(height))?;
    dom.append_child(parent, node)?;
    Ok(node)
}

/// A focusable framed box, highlighted while focused.
fn field(dom: &mut Dom, parent: NodeId, id: &str, focused: Option<&str>) -> weft_ui::Result<NodeId> {
    let node = framed(dom, parent, BorderStyle::Single, 3.0)?;
    dom.set_id(node, Some(id.to_owned()))?;
    dom.set_focusable(node, true)?;
    if focused == Some(id) {
        dom.set_border(node, Border::new(BorderStyle::Bold).color(ACCENT))?;
    }
    Ok(node)
}

fn text(dom: &mut Dom, parent: NodeId, content: &str, style: Style) -> weft_ui::Result<NodeId> {
    let node = dom.create_text(content)?;
    dom.set_style(node, style)?;
    dom.append_child(parent, node)?;
    Ok(node)
}

const fn viewport_rows(size: Size) -> u16 {
    size.rows.saturating_sub(CHROME_ROWS)
}

/// Wall-clock time of day, UTC.
fn clock_now() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs());
    let day = secs % 86_400;
    format!("{:02}:{:02}:{:02}", day / 3600, day % 3600 / 60, day % 60)
}

// ─── App ────────────────────────────────────────────────────────────────────

impl App for Chat {
    fn on_input(&mut self, event: &InputEvent, _ctl: &mut LoopControl) -> Action {
        match self.runtime.handle_input(event) {
            Ok(true) => return Action::Continue,
            Ok(false) => {}
            Err(e) => warn!(%e, "focus traversal failed"),
        }

        match event {
            InputEvent::Key(key) => self.on_key(key),
            InputEvent::Paste(text) => {
                if self.focused_id() == Some(INPUT_ID) {
                    self.type_text(text);
                }
                Action::Continue
            }
            InputEvent::Mouse(m) if m.kind == MouseKind::Scroll => {
                match m.button {
                    MouseButton::WheelUp => self.list.scroll_items(-3),
                    MouseButton::WheelDown => self.list.scroll_items(3),
                    _ => {}
                }
                Action::Continue
            }
            _ => Action::Continue,
        }
    }

    fn on_resize(&mut self, size: Size, _ctl: &mut LoopControl) {
        info!(cols = size.cols, rows = size.rows, "resized");
        self.size = size;
        self.list.set_viewport(viewport_rows(size));
    }

    fn on_timer(&mut self, id: TimerId, ctl: &mut LoopControl) -> Action {
        if Some(id) == self.clock_timer {
            self.clock = clock_now();
            ctl.request_render();
        }
        Action::Continue
    }

    fn on_tick(&mut self) -> bool {
        self.runtime.take_render_request()
    }

    fn paint(&mut self, buf: &mut FrameBuffer) {
        if let Err(e) = self.frame() {
            warn!(%e, "frame failed");
        }
        self.runtime.paint(buf);
    }

    fn cursor(&self) -> Option<(u16, u16, CursorShape)> {
        if self.focused_id() != Some(INPUT_ID) {
            return None;
        }
        let dom = self.runtime.dom();
        let node = dom.find_by_id(self.runtime.root()?, INPUT_ID)?;
        let b = dom.absolute_box(node)?;
        let prompt = string_width("> ") + string_width(&self.input);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let (x, y) = (b.x as usize + 1 + prompt, b.y as u16 + 1);
        Some((u16::try_from(x).ok()?, y, CursorShape::Bar))
    }
}

// ─── Startup ────────────────────────────────────────────────────────────────

fn init_logging() {
    let filter = EnvFilter::try_from_env("WEFT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    match File::create("weft.log") {
        Ok(file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init(),
        Err(e) => eprintln!("weft: logging disabled: {e}"),
    }
}

/// The path following `--record`, if given.
fn record_path(args: &[String]) -> Option<&str> {
    let at = args.iter().position(|a| a == "--record")?;
    args.get(at + 1).map(String::as_str)
}

fn main() {
    init_logging();
    let args: Vec<String> = env::args().collect();

    let mut event_loop = EventLoop::new();
    let size = event_loop.size();

    if let Some(path) = record_path(&args) {
        let config = RecordConfig {
            width: size.cols,
            height: size.rows,
            ..RecordConfig::default()
        };
        match FileRecorder::create(path, config) {
            Ok(rec) => event_loop.set_recorder(rec),
            Err(e) => {
                eprintln!("weft: cannot record to {path}: {e}");
                process::exit(1);
            }
        }
    }

    let mut chat = Chat::new(size).unwrap_or_else(|e| {
        eprintln!("weft: {e}");
        process::exit(1);
    });

    match event_loop.control().add_timer(Duration::from_secs(1), true) {
        Ok(id) => chat.clock_timer = Some(id),
        Err(e) => warn!(%e, "clock timer not started"),
    }

    let result = event_loop.run(&mut chat);
    if let Some(Err(e)) = event_loop.take_recorder().map(FileRecorder::finish) {
        eprintln!("weft: recording not flushed: {e}");
    }
    if let Err(e) = result {
        eprintln!("weft: {e}");
        process::exit(1);
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
