//! Interactive terminal session.
//!
//! One thread owns everything: the event loop drains tick notifications
//! and host close signals, redraws, then polls the terminal for input.
//! Clock pumps only send widget ids over a channel; no timer state is
//! touched off this thread.

use std::io;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use pintimer_core::{
    AlertGenerator, Clock, ControlId, Position, SurfaceLocation, SystemClock, Theme, TickNotifier,
    TimerConfig, TimerWidget, WidgetEvent, WidgetId, WidgetOptions,
};

use crate::bell;
use self::host::TerminalHost;

mod draw;
mod host;

const POLL_MS: u64 = 50;

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Pin each widget on its first successful start.
    pub auto_pin: bool,
    /// Whether the host offers the overlay layer at all.
    pub pin_capability: bool,
    pub mute: bool,
}

/// Run the session until the user quits.
pub fn run(configs: Vec<TimerConfig>, options: RunOptions) -> Result<()> {
    let base_config = configs.first().copied().unwrap_or_default();

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = (|| -> Result<()> {
        let mut app = App::new(options, base_config);
        for config in configs {
            app.open_widget(config);
        }
        loop {
            app.pump_ticks();
            app.pump_close_signals();
            terminal.draw(|frame| draw::render(frame, &mut app))?;
            if event::poll(Duration::from_millis(POLL_MS))? {
                match event::read()? {
                    Event::Key(key) => {
                        if app.handle_key(key) {
                            break;
                        }
                    }
                    Event::Mouse(mouse) => app.handle_mouse(mouse),
                    _ => {}
                }
            }
        }
        app.close_all();
        Ok(())
    })();

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    result
}

/// An in-flight header drag: which widget, and the grab offset from its
/// origin, so the box does not jump under the cursor.
#[derive(Debug, Clone, Copy)]
struct DragGrab {
    widget: WidgetId,
    dx: i32,
    dy: i32,
}

struct App {
    host: TerminalHost,
    clock: Arc<dyn Clock>,
    widgets: Vec<TimerWidget>,
    tick_rx: Receiver<WidgetId>,
    notifier: TickNotifier,
    options: RunOptions,
    /// Configuration cloned for widgets opened with the `n` key.
    base_config: TimerConfig,
    focus: Option<WidgetId>,
    drag: Option<DragGrab>,
    /// How many widgets have been opened, for staggered placement.
    opened: usize,
    status: String,
    theme: Theme,
}

impl App {
    fn new(options: RunOptions, base_config: TimerConfig) -> Self {
        let (tick_tx, tick_rx) = mpsc::channel();
        let notifier: TickNotifier = Arc::new(move |id| {
            let _ = tick_tx.send(id);
        });
        let mut host = TerminalHost::new();
        host.capability = options.pin_capability;
        Self {
            host,
            clock: Arc::new(SystemClock::new()),
            widgets: Vec::new(),
            tick_rx,
            notifier,
            options,
            base_config,
            focus: None,
            drag: None,
            opened: 0,
            status: "ready".to_string(),
            theme: Theme::default(),
        }
    }

    fn open_widget(&mut self, config: TimerConfig) {
        let alert = if self.options.mute {
            AlertGenerator::disabled()
        } else {
            AlertGenerator::new(bell::factory())
        };
        let widget_options = WidgetOptions {
            alert,
            auto_pin: self.options.auto_pin,
            theme: self.theme,
        };
        let widget = TimerWidget::open(
            config,
            widget_options,
            Arc::clone(&self.clock),
            Arc::clone(&self.notifier),
            self.opened,
            &mut self.host,
        );
        self.opened += 1;
        self.focus = Some(widget.id());
        self.widgets.push(widget);
    }

    /// Deliver pending tick notifications to their widgets.
    fn pump_ticks(&mut self) {
        while let Ok(id) = self.tick_rx.try_recv() {
            if let Some(index) = self.widgets.iter().position(|w| w.id() == id) {
                let events = self.widgets[index].on_tick(&mut self.host);
                self.note(&events);
            }
        }
    }

    /// Deliver host-side pinned closures. Each signal belongs to at most
    /// one widget; the rest ignore it.
    fn pump_close_signals(&mut self) {
        for context in self.host.take_close_signals() {
            for index in 0..self.widgets.len() {
                let events = self.widgets[index].on_pinned_closed(context, &mut self.host);
                if !events.is_empty() {
                    self.note(&events);
                    break;
                }
            }
        }
    }

    /// Returns true when the session should end.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Char('n') => {
                let config = self.base_config;
                self.open_widget(config);
            }
            KeyCode::Tab => self.cycle_focus(),
            KeyCode::PageUp => self.host.scroll_page(-4),
            KeyCode::PageDown => self.host.scroll_page(4),
            code => {
                if let Some(control) = shortcut_control(code) {
                    self.press_focused(control);
                }
            }
        }
        false
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => self.mouse_down(mouse.column, mouse.row),
            MouseEventKind::Drag(MouseButton::Left) => self.mouse_drag(mouse.column, mouse.row),
            MouseEventKind::Up(MouseButton::Left) => self.drag = None,
            MouseEventKind::ScrollUp => self.host.scroll_page(-2),
            MouseEventKind::ScrollDown => self.host.scroll_page(2),
            _ => {}
        }
    }

    fn mouse_down(&mut self, column: u16, row: u16) {
        if let Some(hit) = self.host.hit_at(column, row) {
            self.focus = Some(hit.widget);
            if hit.control == ControlId::Header && hit.location == SurfaceLocation::Primary {
                self.begin_drag(hit.widget, column, row);
                return;
            }
            // Presses route only through bindings that still exist.
            if self.host.binding_live(hit.widget, hit.control, hit.location) {
                self.press(hit.widget, hit.control);
            }
            return;
        }
        if let Some(widget) = self.host.body_at(column, row) {
            self.focus = Some(widget);
        }
    }

    fn begin_drag(&mut self, widget: WidgetId, column: u16, row: u16) {
        let Some(origin) = self.host.origin_of(widget) else {
            return;
        };
        let (px, py) = self.host.to_page(column, row);
        self.drag = Some(DragGrab {
            widget,
            dx: px - origin.x,
            dy: py - origin.y,
        });
    }

    fn mouse_drag(&mut self, column: u16, row: u16) {
        let Some(grab) = self.drag else {
            return;
        };
        let (px, py) = self.host.to_page(column, row);
        let target = Position {
            x: px - grab.dx,
            y: py - grab.dy,
        };
        if let Some(index) = self.widgets.iter().position(|w| w.id() == grab.widget) {
            self.widgets[index].drag(target, &mut self.host);
        }
    }

    /// Keyboard shortcuts go to the focused widget, and only while it
    /// holds a live shortcut claim.
    fn press_focused(&mut self, control: ControlId) {
        let Some(id) = self.focus else {
            return;
        };
        if !self.host.has_claim(id) {
            return;
        }
        self.press(id, control);
    }

    fn press(&mut self, id: WidgetId, control: ControlId) {
        let Some(index) = self.widgets.iter().position(|w| w.id() == id) else {
            return;
        };
        let events = self.widgets[index].press(control, &mut self.host);
        self.note(&events);
        if events.iter().any(|e| matches!(e, WidgetEvent::Closed { .. })) {
            self.widgets.remove(index);
            if self.focus == Some(id) {
                self.focus = self.widgets.last().map(|w| w.id());
            }
        }
    }

    fn cycle_focus(&mut self) {
        if self.widgets.is_empty() {
            self.focus = None;
            return;
        }
        let next = match self
            .focus
            .and_then(|id| self.widgets.iter().position(|w| w.id() == id))
        {
            Some(index) => (index + 1) % self.widgets.len(),
            None => 0,
        };
        self.focus = Some(self.widgets[next].id());
    }

    fn note(&mut self, events: &[WidgetEvent]) {
        if let Some(last) = events.last() {
            self.status = event_label(last);
        }
    }

    fn close_all(&mut self) {
        let mut widgets = std::mem::take(&mut self.widgets);
        for widget in widgets.iter_mut().rev() {
            widget.close(&mut self.host);
        }
        self.focus = None;
    }
}

fn shortcut_control(code: KeyCode) -> Option<ControlId> {
    match code {
        KeyCode::Char(' ') | KeyCode::Enter => Some(ControlId::StartStop),
        KeyCode::Char('r') => Some(ControlId::Reset),
        KeyCode::Char('+') | KeyCode::Char('=') => Some(ControlId::AdjustPlus),
        KeyCode::Char('-') => Some(ControlId::AdjustMinus),
        KeyCode::Char('1') => Some(ControlId::SizeSmall),
        KeyCode::Char('2') => Some(ControlId::SizeMedium),
        KeyCode::Char('3') => Some(ControlId::SizeLarge),
        KeyCode::Char('p') => Some(ControlId::Pin),
        KeyCode::Char('x') => Some(ControlId::Close),
        _ => None,
    }
}

fn event_label(event: &WidgetEvent) -> String {
    fn mmss(total: u32) -> String {
        format!("{:02}:{:02}", total / 60, total % 60)
    }
    match event {
        WidgetEvent::Started { value, .. } => format!("started at {}", mmss(*value)),
        WidgetEvent::Stopped { value, .. } => format!("stopped at {}", mmss(*value)),
        WidgetEvent::Reset { value, .. } => format!("reset to {}", mmss(*value)),
        WidgetEvent::Adjusted { delta, value, .. } => {
            format!("adjusted {delta:+}s to {}", mmss(*value))
        }
        WidgetEvent::Expired { alerted: true, .. } => "time up".to_string(),
        WidgetEvent::Expired { alerted: false, .. } => "time up (silent)".to_string(),
        WidgetEvent::SizeChanged { size, .. } => format!("size {size:?}").to_lowercase(),
        WidgetEvent::Pinned { .. } => "pinned on top".to_string(),
        WidgetEvent::Restored { .. } => "restored to page".to_string(),
        WidgetEvent::Closed { .. } => "widget closed".to_string(),
    }
}
