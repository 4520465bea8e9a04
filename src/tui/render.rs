use std::borrow::Cow;

use super::state::{AppState, Focus, StatusLevel, MENU_ITEMS};
use crate::compose::Composer;
use crate::feed::{can_delete, LoadPhase, Post};
use crate::profile::{EditorField, ProfileEditor, ProfileView, Relationship};
use crate::route::Route;
use crate::session::Session;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

const SPINNER_FRAMES: &[char] = &['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
const HEADER_ROWS: u16 = 3;
const PROFILE_ROWS: u16 = 6;
const COMPOSER_ROWS: u16 = 5;
pub const END_MARKER: &str = "You've reached the end!";
pub const LOADING_TEXT: &str = "Loading posts...";

/// Screen regions for a page that shows the feed.
struct PageAreas {
    header: Rect,
    profile: Rect,
    root: Rect,
    composer: Rect,
    feed: Rect,
    status: Rect,
    footer: Rect,
}

fn page_areas(area: Rect, state: &AppState) -> PageAreas {
    let profile_rows = if matches!(state.route, Route::Profile { .. }) { PROFILE_ROWS } else { 0 };
    let root_rows = if state.feed.root_post().is_some() { state.card_rows } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(HEADER_ROWS),
            Constraint::Length(profile_rows),
            Constraint::Length(root_rows),
            Constraint::Length(COMPOSER_ROWS),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);
    PageAreas {
        header: chunks[0],
        profile: chunks[1],
        root: chunks[2],
        composer: chunks[3],
        feed: chunks[4],
        status: chunks[5],
        footer: chunks[6],
    }
}

/// Rows inside the feed pane border for a terminal of size `area`, or `None`
/// when the current screen has no feed.
pub fn feed_viewport_rows(area: Rect, state: &AppState) -> Option<u16> {
    if !state.route.has_feed() {
        return None;
    }
    let rows = page_areas(area, state).feed.height.saturating_sub(2);
    (rows > 0).then_some(rows)
}

pub fn draw(f: &mut Frame, state: &AppState, spinner_frame: u8) {
    if state.focus == Focus::Logs {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(f.area());
        draw_logs(f, state, chunks[0]);
        draw_footer(f, state, chunks[1]);
        return;
    }

    match &state.route {
        Route::Login => draw_login(f, state),
        Route::NotFound => draw_not_found(f, state),
        Route::Home | Route::Profile { .. } => {
            let areas = page_areas(f.area(), state);
            draw_header(f, state, areas.header, spinner_frame);
            if let Some(profile) = &state.profile {
                draw_profile_header(f, state, profile, areas.profile);
            }
            if let Some(root) = state.feed.root_post() {
                draw_root_post(f, state, root, areas.root);
            }
            draw_composer(f, state, areas.composer);
            draw_feed(f, state, areas.feed, spinner_frame);
            draw_status(f, state, areas.status);
            draw_footer(f, state, areas.footer);

            match state.focus {
                Focus::Menu => draw_menu(f, state),
                Focus::Search => draw_search(f, state),
                _ => {}
            }
            if let Some(editor) = &state.editor {
                draw_editor(f, editor);
            }
        }
    }
}

fn draw_header(f: &mut Frame, state: &AppState, area: Rect, spinner_frame: u8) {
    let who = state
        .session
        .as_ref()
        .map(|s| format!("@{}", s.username))
        .unwrap_or_default();

    let activity = if state.feed.is_loading() || state.pending_interactions > 0 {
        let ch = SPINNER_FRAMES[(spinner_frame as usize) % SPINNER_FRAMES.len()];
        let label = if state.pending_interactions > 0 {
            format!(" {} {} pending", ch, state.pending_interactions)
        } else {
            format!(" {} syncing", ch)
        };
        Span::styled(label, Style::default().fg(Color::Cyan))
    } else {
        Span::styled(" idle", Style::default().fg(Color::DarkGray))
    };

    let page = match &state.route {
        Route::Profile { username } => format!("Profile @{}", username),
        _ => "Home".to_string(),
    };

    let line = Line::from(vec![
        Span::styled(" chirp ", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
        Span::raw(who),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::raw(page),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(state.backend_label.clone(), Style::default().fg(Color::DarkGray)),
        Span::styled(" |", Style::default().fg(Color::DarkGray)),
        activity,
        Span::styled(format!(" | up {}", state.uptime()), Style::default().fg(Color::DarkGray)),
    ]);

    let block = Block::default().borders(Borders::ALL);
    f.render_widget(Paragraph::new(line).block(block), area);
}

fn draw_profile_header(f: &mut Frame, state: &AppState, profile: &ProfileView, area: Rect) {
    if area.height == 0 {
        return;
    }
    let initial = profile.username.chars().next().map(|c| c.to_ascii_uppercase()).unwrap_or('?');
    let mut lines = vec![
        Line::from(vec![
            Span::styled(format!(" ({}) ", initial), Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
            Span::styled(format!("@{}", profile.username), Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(
                profile.picture.as_deref().map(|p| format!("  {}", p)).unwrap_or_default(),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        Line::from(Span::styled(
            format!(" {}", profile.bio_text()),
            Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
        )),
    ];

    if let Some(session) = &state.session {
        lines.push(relationship_line(profile, session));
    }

    let block = Block::default().title(" Profile ").borders(Borders::ALL);
    f.render_widget(Paragraph::new(lines).block(block), area);
}

/// Edit for the owner; follow/block only once both flags are known.
fn relationship_line(profile: &ProfileView, session: &Session) -> Line<'static> {
    if profile.can_edit(session) {
        return Line::from(vec![
            Span::styled(" [e]", Style::default().fg(Color::Yellow)),
            Span::raw(" Edit"),
        ]);
    }
    let mut spans = Vec::new();
    if let Some(action) = profile.action(session, Relationship::Follow) {
        spans.push(Span::styled(" [F]", Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(format!(" {}  ", action.label())));
    }
    if let Some(action) = profile.action(session, Relationship::Block) {
        spans.push(Span::styled("[B]", Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(format!(" {}", action.label())));
    }
    Line::from(spans)
}

fn draw_root_post(f: &mut Frame, state: &AppState, root: &Post, area: Rect) {
    if area.height == 0 {
        return;
    }
    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;
    let lines = card_lines(root, state.session.as_ref(), inner_width, inner_height);
    let block = Block::default()
        .title(" Replies to ")
        .title_bottom(Line::from(" [Esc] close ").alignment(Alignment::Right))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_composer(f: &mut Frame, state: &AppState, area: Rect) {
    let root = state.feed.root_post();
    let focused = state.focus == Focus::Composer;
    let composer = &state.composer;

    let body = if composer.is_empty() {
        vec![Line::from(Span::styled(
            Composer::placeholder(root),
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        let width = area.width.saturating_sub(2) as usize;
        let max_lines = area.height.saturating_sub(2) as usize;
        let mut lines: Vec<Line> = wrap_text(composer.text(), width, usize::MAX)
            .into_iter()
            .map(Line::from)
            .collect();
        // Keep the cursor end in view.
        if lines.len() > max_lines {
            lines.drain(..lines.len() - max_lines);
        }
        lines
    };

    let counter_style = if composer.near_limit() {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let submit_style = if composer.can_submit() {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let bottom = Line::from(vec![
        Span::styled(format!(" {} ", composer.counter()), counter_style),
        Span::styled(format!("[Enter] {} ", Composer::submit_label(root)), submit_style),
    ])
    .alignment(Alignment::Right);

    let border = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let title = if root.is_some() { " Reply " } else { " New post " };
    let block = Block::default()
        .title(title)
        .title_bottom(bottom)
        .borders(Borders::ALL)
        .border_style(border);
    f.render_widget(Paragraph::new(body).block(block), area);
}

fn draw_feed(f: &mut Frame, state: &AppState, area: Rect, spinner_frame: u8) {
    let feed = &state.feed;
    let title = match (feed.root_post(), feed.phase()) {
        (_, LoadPhase::Loaded) if !feed.all_posts().is_empty() => {
            format!(" Posts [{}/{}] ", feed.visible().len(), feed.all_posts().len())
        }
        (Some(_), _) => " Replies ".to_string(),
        (None, _) => " Posts ".to_string(),
    };
    let mut block = Block::default().title(title).borders(Borders::ALL);
    if feed.shows_end_marker() {
        block = block.title_bottom(
            Line::from(Span::styled(format!(" {} ", END_MARKER), Style::default().fg(Color::Green)))
                .alignment(Alignment::Center),
        );
    }
    let inner = block.inner(area);
    f.render_widget(block, area);

    // While a load is in flight the spinner replaces the list.
    let message = match feed.phase() {
        LoadPhase::Loading => {
            let ch = SPINNER_FRAMES[(spinner_frame as usize) % SPINNER_FRAMES.len()];
            Some(Line::from(Span::styled(format!("{} {}", ch, LOADING_TEXT), Style::default().fg(Color::Cyan))))
        }
        LoadPhase::Failed(reason) => Some(Line::from(vec![
            Span::styled(
                truncate_with_ellipsis(&format!("Couldn't load posts: {}", reason), inner.width.saturating_sub(12) as usize)
                    .into_owned(),
                Style::default().fg(Color::Red),
            ),
            Span::styled("  [r] retry", Style::default().fg(Color::Yellow)),
        ])),
        LoadPhase::Idle => Some(Line::from("")),
        LoadPhase::Loaded if feed.all_posts().is_empty() => {
            let text = if feed.root_post().is_some() { "No replies yet." } else { "No posts yet." };
            Some(Line::from(Span::styled(text, Style::default().fg(Color::DarkGray))))
        }
        LoadPhase::Loaded => None,
    };
    if let Some(line) = message {
        f.render_widget(Paragraph::new(line).alignment(Alignment::Center), inner);
        return;
    }

    let card = state.card_rows.max(1);
    let first = (state.feed_scroll / u32::from(card)) as usize;
    let mut y = inner.y;
    for (index, post) in feed.visible().iter().enumerate().skip(first) {
        if y >= inner.y + inner.height {
            break;
        }
        let height = card.min(inner.y + inner.height - y);
        let slot = Rect::new(inner.x, y, inner.width, height);
        let shown = feed.effective_post(post);
        draw_card(f, state, &shown, slot, index == state.feed_selected);
        y += height;
    }
}

fn draw_card(f: &mut Frame, state: &AppState, post: &Post, area: Rect, selected: bool) {
    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;
    let lines = card_lines(post, state.session.as_ref(), inner_width, inner_height);
    let border = if selected {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::default().borders(Borders::ALL).border_style(border);
    f.render_widget(Paragraph::new(lines).block(block), area);
}

/// Author line, wrapped text, optional image, then the counters. The counter
/// row always survives; text gives way first.
fn card_lines(post: &Post, session: Option<&Session>, width: usize, height: usize) -> Vec<Line<'static>> {
    if height == 0 {
        return Vec::new();
    }
    let mut author = vec![
        Span::styled(format!("({}) ", post.initial()), Style::default().fg(Color::Green)),
        Span::styled(post.author_display_name.clone(), Style::default().add_modifier(Modifier::BOLD)),
    ];
    if let Some(at) = &post.posted_at {
        author.push(Span::styled(format!(" · {}", at), Style::default().fg(Color::DarkGray)));
    }
    if session.is_some_and(|s| can_delete(s, post)) {
        author.push(Span::styled("  [d] delete", Style::default().fg(Color::Red)));
    }

    let like_style = if post.liked {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    let retweet_style = if post.retweeted {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    let counters = Line::from(vec![
        Span::styled(format!("{} {}", if post.liked { '♥' } else { '♡' }, post.like_count), like_style),
        Span::raw("   "),
        Span::styled(format!("RT {}", post.retweet_count), retweet_style),
        Span::raw("   "),
        Span::styled(format!("↩ {}", post.reply_count), Style::default().fg(Color::Gray)),
    ]);

    let mut lines = vec![Line::from(author)];
    let image = post.image_url.as_ref().map(|url| {
        Line::from(Span::styled(
            truncate_with_ellipsis(&format!("[image] {}", url), width).into_owned(),
            Style::default().fg(Color::Blue),
        ))
    });
    let reserved = 2 + usize::from(image.is_some());
    let text_rows = height.saturating_sub(reserved);
    lines.extend(wrap_text(&post.text, width, text_rows).into_iter().map(Line::from));
    if let Some(image) = image {
        if lines.len() + 1 < height {
            lines.push(image);
        }
    }
    if height >= 2 {
        lines.push(counters);
    }
    lines.truncate(height);
    lines
}

fn draw_status(f: &mut Frame, state: &AppState, area: Rect) {
    let Some(status) = &state.status else {
        return;
    };
    let color = match status.level {
        StatusLevel::Info => Color::Green,
        StatusLevel::Warn => Color::Yellow,
        StatusLevel::Error => Color::Red,
    };
    let msg = truncate_with_ellipsis(&status.message, area.width.saturating_sub(2) as usize);
    let para = Paragraph::new(Line::from(Span::styled(format!(" {}", msg), Style::default().fg(color))));
    f.render_widget(para, area);
}

fn draw_logs(f: &mut Frame, state: &AppState, area: Rect) {
    let max_width = area.width.saturating_sub(2) as usize; // borders
    let visible_lines = area.height.saturating_sub(2) as usize;

    let total = state.logs.len();
    let offset = state.log_scroll_offset.min(total.saturating_sub(visible_lines));

    let lines: Vec<Line> = state
        .logs
        .iter()
        .rev()
        .skip(offset)
        .take(visible_lines)
        .map(|l| {
            let color = match l.level.as_str() {
                "ERROR" => Color::Red,
                "WARN" => Color::Yellow,
                _ => Color::DarkGray,
            };
            let prefix = format!(" {} [{}] ", l.time, l.level);
            let msg_max = max_width.saturating_sub(prefix.len());
            let msg = truncate_with_ellipsis(&l.message, msg_max);
            Line::from(vec![
                Span::styled(prefix, Style::default().fg(color)),
                Span::raw(msg.into_owned()),
            ])
        })
        .collect();

    let title = format!(" Activity Log [{}/{} lines] ", offset + visible_lines.min(total), total);
    let block = Block::default().title(title).borders(Borders::ALL);
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn key_hint(key: &str, label: &str) -> [Span<'static>; 2] {
    [
        Span::styled(format!("[{}]", key), Style::default().fg(Color::Yellow)),
        Span::raw(format!(" {}  ", label)),
    ]
}

fn draw_footer(f: &mut Frame, state: &AppState, area: Rect) {
    let hints: Vec<(&str, &str)> = match state.focus {
        Focus::Login => vec![("Enter", "continue"), ("Esc", "quit")],
        Focus::Composer => vec![("Enter", Composer::submit_label(state.feed.root_post())), ("Esc", "back")],
        Focus::Editor => vec![("Tab", "next field"), ("Enter", "save"), ("Esc", "close")],
        Focus::Search => vec![("↑/↓", "select"), ("Enter", "open"), ("Esc", "close")],
        Focus::Menu => vec![("j/k", "select"), ("Enter", "open"), ("Esc", "close")],
        Focus::Logs => vec![("Esc", "back"), ("j/k", "scroll"), ("g/G", "oldest/newest")],
        Focus::Feed => {
            let mut hints = vec![
                ("q", "quit"),
                ("j/k", "move"),
                ("l", "like"),
                ("t", "retweet"),
                ("c", "reply"),
                ("n", "new post"),
                ("p", "author"),
                ("m", "menu"),
                ("/", "search"),
                ("r", "reload"),
                ("L", "logs"),
            ];
            if state.feed.root_post().is_some() {
                hints.push(("Esc", "close replies"));
            }
            hints
        }
    };
    let mut spans = vec![Span::raw(" ")];
    for (key, label) in hints {
        spans.extend(key_hint(key, label));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_login(f: &mut Frame, state: &AppState) {
    let area = centered(f.area(), 50, 9);
    let lines = vec![
        Line::from(Span::styled("Welcome to chirp", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))),
        Line::from(""),
        Line::from("Sign in with a display name"),
        Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Yellow)),
            Span::raw(state.login_input.clone()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            state.status.as_ref().map(|s| s.message.clone()).unwrap_or_default(),
            Style::default().fg(Color::Yellow),
        )),
        Line::from(Span::styled("[Enter] continue  [Esc] quit", Style::default().fg(Color::DarkGray))),
    ];
    let block = Block::default().title(" chirp ").borders(Borders::ALL);
    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center).block(block), area);
}

fn draw_not_found(f: &mut Frame, _state: &AppState) {
    let area = centered(f.area(), 40, 6);
    let lines = vec![
        Line::from(Span::styled("404", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))),
        Line::from("Page not found."),
        Line::from(Span::styled("[Enter] go home  [q] quit", Style::default().fg(Color::DarkGray))),
    ];
    let block = Block::default().borders(Borders::ALL);
    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center).block(block), area);
}

fn draw_menu(f: &mut Frame, state: &AppState) {
    let full = f.area();
    let height = (MENU_ITEMS.len() as u16 + 2).min(full.height);
    let area = Rect::new(full.x, full.y + HEADER_ROWS.min(full.height.saturating_sub(height)), 20.min(full.width), height);
    let lines: Vec<Line> = MENU_ITEMS
        .iter()
        .enumerate()
        .map(|(i, item)| {
            if i == state.menu_selected {
                Line::from(Span::styled(
                    format!("> {}", item.label()),
                    Style::default().fg(Color::Black).bg(Color::Green),
                ))
            } else {
                Line::from(format!("  {}", item.label()))
            }
        })
        .collect();
    f.render_widget(Clear, area);
    let block = Block::default().title(" Menu ").borders(Borders::ALL);
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_search(f: &mut Frame, state: &AppState) {
    let full = f.area();
    let width = 32.min(full.width);
    let height = full.height.saturating_sub(HEADER_ROWS + 2).max(3).min(full.height);
    let area = Rect::new(full.x + full.width - width, full.y + HEADER_ROWS.min(full.height - height), width, height);
    let dir = &state.directory;

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Search: ", Style::default().fg(Color::Yellow)),
            Span::raw(dir.query().to_string()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ]),
        Line::from(""),
    ];
    if !dir.is_loaded() {
        lines.push(Line::from(Span::styled("Loading users...", Style::default().fg(Color::Cyan))));
    } else {
        let matches = dir.matches();
        if matches.is_empty() {
            lines.push(Line::from(Span::styled("No users found.", Style::default().fg(Color::DarkGray))));
        }
        for (i, user) in matches.iter().enumerate() {
            let name = truncate_with_ellipsis(&user.username, width.saturating_sub(6) as usize).into_owned();
            if i == dir.selected_index() {
                lines.push(Line::from(Span::styled(
                    format!("> @{}", name),
                    Style::default().fg(Color::Black).bg(Color::Green),
                )));
            } else {
                lines.push(Line::from(format!("  @{}", name)));
            }
        }
    }
    f.render_widget(Clear, area);
    let block = Block::default().title(" Users ").borders(Borders::ALL);
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_editor(f: &mut Frame, editor: &ProfileEditor) {
    let area = centered(f.area(), 60, 12);
    let width = area.width.saturating_sub(4) as usize;
    let mut lines = Vec::new();
    for field in [EditorField::Username, EditorField::Bio, EditorField::Picture] {
        let active = editor.field == field;
        let label_style = if active {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        lines.push(Line::from(Span::styled(field.label(), label_style)));
        let value = editor.value(field);
        let shown = if value.chars().count() > width {
            let skip = value.chars().count() - width;
            Cow::Owned(value.chars().skip(skip).collect::<String>())
        } else {
            Cow::Borrowed(value)
        };
        let mut spans = vec![Span::raw(format!("  {}", shown))];
        if active {
            spans.push(Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)));
        }
        lines.push(Line::from(spans));
    }
    lines.push(Line::from(""));
    if let Some(error) = editor.error() {
        lines.push(Line::from(Span::styled(error.to_string(), Style::default().fg(Color::Red))));
    }
    let save = if editor.is_saving() { "Saving..." } else { "[Enter] Save Changes" };
    let save_style = if editor.can_save() {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    lines.push(Line::from(Span::styled(save, save_style)));

    f.render_widget(Clear, area);
    let block = Block::default()
        .title(" Edit Profile ")
        .title_bottom(Line::from(" [Esc] close ").alignment(Alignment::Right))
        .borders(Borders::ALL);
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect::new(area.x + (area.width - w) / 2, area.y + (area.height - h) / 2, w, h)
}

/// Greedy word wrap to `width` columns, at most `max_lines` lines. Words
/// longer than a line are split.
fn wrap_text(text: &str, width: usize, max_lines: usize) -> Vec<String> {
    let mut out = Vec::new();
    if width == 0 || max_lines == 0 {
        return out;
    }
    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_len = 0;
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            loop {
                let gap = usize::from(current_len > 0);
                if current_len + gap + word.len() <= width {
                    if gap == 1 {
                        current.push(' ');
                    }
                    current.extend(word.iter());
                    current_len += gap + word.len();
                    break;
                }
                if current_len > 0 {
                    out.push(std::mem::take(&mut current));
                    current_len = 0;
                    continue;
                }
                let rest = word.split_off(width);
                out.push(word.iter().collect());
                word = rest;
            }
        }
        out.push(current);
        if out.len() >= max_lines {
            break;
        }
    }
    if out.len() > max_lines {
        out.truncate(max_lines);
        if let Some(last) = out.last_mut() {
            let head: String = last.chars().take(width.saturating_sub(3)).collect();
            *last = format!("{}...", head.trim_end());
        }
    }
    out
}

fn truncate_with_ellipsis(s: &str, max_width: usize) -> Cow<'_, str> {
    let char_count = s.chars().count();
    if char_count <= max_width {
        Cow::Borrowed(s)
    } else if max_width <= 3 {
        Cow::Owned(".".repeat(max_width))
    } else {
        let end = s
            .char_indices()
            .nth(max_width - 3)
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        Cow::Owned(format!("{}...", &s[..end]))
    }
}
