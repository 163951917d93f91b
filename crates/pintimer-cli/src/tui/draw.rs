//! Frame rendering: page pane, widget chrome, placeholder, overlay and
//! status line. Hit regions are collected in draw order and handed to
//! the host at the end of every pass.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
    Frame,
};

use pintimer_core::{ControlId, Extent, SizeClass, SurfaceLocation, Theme, WidgetId, WidgetNodes};

use super::host::{BodyRegion, HitRegion, TerminalHost};
use super::App;

pub(super) fn render(frame: &mut Frame<'_>, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(frame.area());
    let page = chunks[0];
    let status_area = chunks[1];

    app.host.begin_frame(page);
    let mut hits: Vec<HitRegion> = Vec::new();
    let mut bodies: Vec<BodyRegion> = Vec::new();

    render_page(frame, &app.host, page);

    // Snapshot the overlay so the host borrow does not span the pass.
    let pinned = app.host.pinned().and_then(|surface| {
        surface.nodes.as_ref().map(|nodes| {
            (
                surface.context,
                surface.widget,
                surface.extent,
                surface.theme,
                nodes.clone(),
            )
        })
    });

    if let Some((_, widget, _, _, nodes)) = &pinned {
        if let Some(text) = app.host.placeholder_of(*widget) {
            render_placeholder(frame, page, nodes, text, *widget, &mut bodies);
        }
    }

    // Page widgets; the focused one is drawn last so it sits on top.
    let mut order: Vec<WidgetId> = app.widgets.iter().map(|w| w.id()).collect();
    if let Some(focused) = app.focus {
        if let Some(index) = order.iter().position(|id| *id == focused) {
            let id = order.remove(index);
            order.push(id);
        }
    }
    for id in order {
        if let Some(nodes) = app.host.primary_nodes_of(id) {
            let rect = page_rect(page, nodes);
            widget_box(
                frame,
                rect,
                nodes,
                &app.theme,
                id,
                SurfaceLocation::Primary,
                app.focus == Some(id),
                &mut hits,
                &mut bodies,
            );
        }
    }

    // The overlay comes after everything else: always on top.
    if let Some((context, widget, extent, theme, nodes)) = &pinned {
        let rect = overlay_rect(page, *extent);
        widget_box(
            frame,
            rect,
            nodes,
            theme,
            *widget,
            SurfaceLocation::Pinned(*context),
            app.focus == Some(*widget),
            &mut hits,
            &mut bodies,
        );
    }

    render_status(frame, status_area, app);

    app.host.install_hits(hits, bodies);
}

fn render_page(frame: &mut Frame<'_>, host: &TerminalHost, area: Rect) {
    let lines: Vec<Line> = host
        .page_lines()
        .iter()
        .map(|line| Line::from(line.as_str()))
        .collect();
    let paragraph = Paragraph::new(lines)
        .style(Style::default().fg(Color::DarkGray))
        .scroll((host.page_scroll(), 0));
    frame.render_widget(paragraph, area);
}

/// Screen rectangle of a widget's nodes on the page, clipped to it.
fn page_rect(page: Rect, nodes: &WidgetNodes) -> Rect {
    let extent = nodes.extent();
    let x = page.x.saturating_add(nodes.origin.x.max(0) as u16);
    let y = page.y.saturating_add(nodes.origin.y.max(0) as u16);
    Rect::new(x, y, extent.width, extent.height).intersection(page)
}

/// The overlay parks in the top-right corner, whatever the page shows.
fn overlay_rect(page: Rect, extent: Extent) -> Rect {
    let width = extent.width.min(page.width);
    let height = extent.height.min(page.height);
    let x = page.right().saturating_sub(width.saturating_add(1));
    let y = page.y.saturating_add(1);
    Rect::new(x, y, width, height).intersection(page)
}

#[allow(clippy::too_many_arguments)]
fn widget_box(
    frame: &mut Frame<'_>,
    rect: Rect,
    nodes: &WidgetNodes,
    theme: &Theme,
    widget: WidgetId,
    location: SurfaceLocation,
    focused: bool,
    hits: &mut Vec<HitRegion>,
    bodies: &mut Vec<BodyRegion>,
) {
    if rect.width < 8 || rect.height < 4 {
        return;
    }
    frame.render_widget(Clear, rect);

    let base = Style::default()
        .fg(rgb(theme.foreground))
        .bg(rgb(theme.background));
    let border = if focused {
        Style::default().fg(rgb(theme.accent))
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let title = match location {
        SurfaceLocation::Primary => " timer ",
        SurfaceLocation::Pinned(_) => " pinned ",
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(if focused {
            BorderType::Thick
        } else {
            BorderType::Plain
        })
        .border_style(border)
        .style(base)
        .title(title);
    let inner = block.inner(rect);
    frame.render_widget(block, rect);

    // Row 0: the time face.
    if inner.height > 0 {
        let face = if nodes.is_expired() {
            base.fg(rgb(theme.alarm)).add_modifier(Modifier::BOLD)
        } else if nodes.is_running() {
            base.fg(rgb(theme.accent)).add_modifier(Modifier::BOLD)
        } else {
            base.add_modifier(Modifier::BOLD)
        };
        let row = Rect::new(inner.x, inner.y, inner.width, 1);
        frame.render_widget(
            Paragraph::new(nodes.display())
                .alignment(Alignment::Center)
                .style(face),
            row,
        );
    }

    // Row 1: transport controls.
    if inner.height > 1 {
        let mut row = RowBuilder::new(widget, location, inner.x + 1, inner.y + 1, inner.right());
        let toggle = if nodes.is_running() { "stop" } else { "start" };
        row.label(ControlId::StartStop, toggle, base.fg(rgb(theme.accent)), hits);
        row.label(ControlId::Reset, "reset", base, hits);
        row.label(ControlId::AdjustPlus, "+60", base, hits);
        row.label(ControlId::AdjustMinus, "-60", base, hits);
        row.flush(frame);
    }

    // Row 2: size classes and surface controls.
    if inner.height > 2 {
        let mut row = RowBuilder::new(widget, location, inner.x + 1, inner.y + 2, inner.right());
        for (control, label, size) in [
            (ControlId::SizeSmall, "s", SizeClass::Small),
            (ControlId::SizeMedium, "m", SizeClass::Medium),
            (ControlId::SizeLarge, "l", SizeClass::Large),
        ] {
            let style = if nodes.size == size {
                base.fg(rgb(theme.accent)).add_modifier(Modifier::UNDERLINED)
            } else {
                base
            };
            row.label(control, label, style, hits);
        }
        row.gap(1);
        if !nodes.is_hidden(ControlId::Pin) {
            row.label(ControlId::Pin, "pin", base, hits);
        }
        if !nodes.is_hidden(ControlId::Close) {
            row.label(ControlId::Close, "x", base.fg(rgb(theme.alarm)), hits);
        }
        row.flush(frame);
    }

    // The top border row is the drag handle.
    hits.push(HitRegion {
        widget,
        control: ControlId::Header,
        location,
        area: Rect::new(rect.x, rect.y, rect.width, 1),
    });
    bodies.push(BodyRegion { widget, area: rect });
}

fn render_placeholder(
    frame: &mut Frame<'_>,
    page: Rect,
    nodes: &WidgetNodes,
    text: &str,
    widget: WidgetId,
    bodies: &mut Vec<BodyRegion>,
) {
    let rect = page_rect(page, nodes);
    if rect.width < 4 || rect.height < 3 {
        return;
    }
    frame.render_widget(Clear, rect);
    let style = Style::default().fg(Color::DarkGray);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(style)
        .style(style);
    let inner = block.inner(rect);
    frame.render_widget(block, rect);
    let middle = Rect::new(inner.x, inner.y + inner.height / 2, inner.width, 1);
    frame.render_widget(
        Paragraph::new(text)
            .alignment(Alignment::Center)
            .style(style),
        middle,
    );
    bodies.push(BodyRegion { widget, area: rect });
}

fn render_status(frame: &mut Frame<'_>, area: Rect, app: &App) {
    const HELP: &str =
        "space start/stop  r reset  +/- adjust  1/2/3 size  p pin  x close  n new  tab focus  q quit";
    let line = Line::from(vec![
        Span::styled(
            app.status.as_str(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(HELP, Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn rgb(c: (u8, u8, u8)) -> Color {
    Color::Rgb(c.0, c.1, c.2)
}

/// Lays one row of clickable labels, clipping at the box edge and
/// registering a hit region per label.
struct RowBuilder {
    widget: WidgetId,
    location: SurfaceLocation,
    start_x: u16,
    x: u16,
    y: u16,
    limit: u16,
    spans: Vec<Span<'static>>,
}

impl RowBuilder {
    fn new(widget: WidgetId, location: SurfaceLocation, x: u16, y: u16, limit: u16) -> Self {
        Self {
            widget,
            location,
            start_x: x,
            x,
            y,
            limit,
            spans: Vec::new(),
        }
    }

    fn label(&mut self, control: ControlId, text: &str, style: Style, hits: &mut Vec<HitRegion>) {
        let width = text.len() as u16;
        if self.x + width > self.limit {
            return;
        }
        hits.push(HitRegion {
            widget: self.widget,
            control,
            location: self.location,
            area: Rect::new(self.x, self.y, width, 1),
        });
        self.spans.push(Span::styled(text.to_string(), style));
        self.spans.push(Span::raw(" "));
        self.x += width + 1;
    }

    fn gap(&mut self, width: u16) {
        if self.x + width > self.limit {
            return;
        }
        self.spans.push(Span::raw(" ".repeat(usize::from(width))));
        self.x += width;
    }

    fn flush(self, frame: &mut Frame<'_>) {
        if self.spans.is_empty() {
            return;
        }
        let row = Rect::new(self.start_x, self.y, self.limit - self.start_x, 1);
        frame.render_widget(Paragraph::new(Line::from(self.spans)), row);
    }
}
