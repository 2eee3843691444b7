use std::mem;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Tabs, Wrap,
};
use ratatui::Frame;
use tracing::{debug, warn};

use crate::bridge::contract::{
    AddClass, AddEmployee, AddStudent, DeleteClass, DeleteEmployee, DeleteStudent, EditPayment,
    GetAllPayments, GetClasses, GetEmployees, GetPayments, GetStudents, MakePayment,
    ResetDatabase, UpdateClass, UpdateEmployee, UpdateStudent,
};
use crate::bridge::Bridge;
use crate::models::{
    ClassUpdate, Employee, EmployeeUpdate, Payment, PaymentUpdate, RecordId, SchoolClass,
    Student, StudentRef, StudentUpdate,
};

use super::dashboard::DashboardSummary;
use super::forms::{
    class_form, employee_form, payment_form, student_form, ConfirmDelete, DeleteTarget,
    FormTarget, RecordForm,
};
use super::helpers::{centered_rect, format_amount, surface_error};
use super::screens::{ListView, RecordTable, StudentPayments, TableRow};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
const TABS_HEIGHT: u16 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tab {
    Dashboard,
    Students,
    Employees,
    Classes,
    Payments,
}

impl Tab {
    const ALL: [Tab; 5] = [
        Tab::Dashboard,
        Tab::Students,
        Tab::Employees,
        Tab::Classes,
        Tab::Payments,
    ];

    fn title(self) -> &'static str {
        match self {
            Tab::Dashboard => "Dashboard",
            Tab::Students => "Students",
            Tab::Employees => "Employees",
            Tab::Classes => "Classes",
            Tab::Payments => "Payments",
        }
    }

    fn index(self) -> usize {
        Tab::ALL.iter().position(|tab| *tab == self).unwrap_or(0)
    }

    fn offset(self, step: isize) -> Tab {
        let len = Tab::ALL.len() as isize;
        let idx = (self.index() as isize + step).rem_euclid(len) as usize;
        Tab::ALL[idx]
    }

    /// Tab whose list a saved form's record belongs to.
    fn for_target(target: FormTarget) -> Tab {
        match target {
            FormTarget::AddStudent | FormTarget::EditStudent(_) => Tab::Students,
            FormTarget::AddEmployee | FormTarget::EditEmployee(_) => Tab::Employees,
            FormTarget::AddClass | FormTarget::EditClass(_) => Tab::Classes,
            FormTarget::MakePayment | FormTarget::EditPayment(_) => Tab::Payments,
        }
    }
}

/// Fine-grained modes layered over the active tab.
enum Mode {
    Normal,
    Form(RecordForm),
    ConfirmDelete(ConfirmDelete),
    ConfirmReset,
    Searching(SearchState),
    StudentPayments(StudentPayments),
}

/// State for an active inline search on the current tab.
struct SearchState {
    query: String,
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI. Every read and write
/// goes through the bridge; the tables only hold the last fetched lists.
pub struct App {
    bridge: Bridge,
    tab: Tab,
    students: RecordTable<Student>,
    employees: RecordTable<Employee>,
    classes: RecordTable<SchoolClass>,
    payments: RecordTable<Payment>,
    dashboard: DashboardSummary,
    mode: Mode,
    status: Option<StatusMessage>,
    /// Student whose payment history reopens once the payment form closes.
    reopen_history: Option<Student>,
}

impl App {
    /// Build the app and fetch every list. A failed fetch is reported in the
    /// footer rather than aborting startup.
    pub fn new(bridge: Bridge) -> Self {
        let mut app = Self {
            bridge,
            tab: Tab::Dashboard,
            students: RecordTable::new(Vec::new()),
            employees: RecordTable::new(Vec::new()),
            classes: RecordTable::new(Vec::new()),
            payments: RecordTable::new(Vec::new()),
            dashboard: DashboardSummary::default(),
            mode: Mode::Normal,
            status: None,
            reopen_history: None,
        };
        if let Err(err) = app.reload_all(None) {
            app.set_status(surface_error(&err), StatusKind::Error);
        }
        app
    }

    /// Hand the bridge back so the caller can shut it down.
    pub fn into_bridge(self) -> Bridge {
        self.bridge
    }

    /// Route a raw terminal key event. Only presses count, and the Ctrl
    /// chords are resolved before the plain key handler sees the code.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> Result<bool> {
        if key.kind != KeyEventKind::Press {
            return Ok(false);
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('r') => {
                    self.handle_ctrl_r();
                    return Ok(false);
                }
                KeyCode::Char('l') => {
                    self.handle_ctrl_l();
                    return Ok(false);
                }
                _ => {}
            }
        }
        self.handle_key(key.code)
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mut mode = mem::replace(&mut self.mode, Mode::Normal);

        mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::Form(form) => self.handle_form(code, form)?,
            Mode::ConfirmDelete(confirm) => self.handle_confirm_delete(code, confirm)?,
            Mode::ConfirmReset => self.handle_confirm_reset(code)?,
            Mode::Searching(state) => self.handle_search(code, state)?,
            Mode::StudentPayments(history) => self.handle_history(code, history)?,
        };

        self.mode = mode;
        Ok(exit)
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match code {
            KeyCode::Char('q') => *exit = true,
            KeyCode::Esc => {
                let filtered = self.active_list().is_some_and(|list| list.filter().is_some());
                if filtered {
                    if let Some(list) = self.active_list() {
                        list.set_filter(None);
                    }
                    self.set_status("Search cleared.", StatusKind::Info);
                } else {
                    *exit = true;
                }
            }
            KeyCode::Tab | KeyCode::Right => self.switch_tab(self.tab.offset(1)),
            KeyCode::BackTab | KeyCode::Left => self.switch_tab(self.tab.offset(-1)),
            KeyCode::Char(ch @ '1'..='5') => {
                let idx = ch as usize - '1' as usize;
                self.switch_tab(Tab::ALL[idx]);
            }
            KeyCode::Up => self.with_list(|list| list.move_selection(-1)),
            KeyCode::Down => self.with_list(|list| list.move_selection(1)),
            KeyCode::PageUp => self.with_list(|list| list.previous_page()),
            KeyCode::PageDown => self.with_list(|list| list.next_page()),
            KeyCode::Home => self.with_list(|list| list.select_first()),
            KeyCode::End => self.with_list(|list| list.select_last()),
            KeyCode::Char('s') => self.with_list(|list| list.cycle_sort_column()),
            KeyCode::Char('o') => self.with_list(|list| list.toggle_sort_direction()),
            KeyCode::Char('f') | KeyCode::Char('/') => {
                if let Some(list) = self.active_list() {
                    let query = list.filter().unwrap_or_default().to_string();
                    return Ok(Mode::Searching(SearchState { query }));
                }
            }
            KeyCode::Char('+') | KeyCode::Char('a') => return Ok(self.open_add_form()),
            KeyCode::Char('e') => return Ok(self.open_edit_form()),
            KeyCode::Char('-') | KeyCode::Char('d') => return Ok(self.open_delete_confirm()),
            KeyCode::Char('p') => {
                if self.tab == Tab::Students {
                    if let Some(student) = self.students.selected_row() {
                        let id = student.id;
                        let form = payment_form(self.students.rows(), None, Some(id));
                        return Ok(Mode::Form(form));
                    }
                    self.set_status("No student selected.", StatusKind::Error);
                }
            }
            KeyCode::Enter => {
                if self.tab == Tab::Students {
                    match self.students.selected_row().cloned() {
                        Some(student) => return Ok(self.open_history(student)),
                        None => self.set_status("No student selected.", StatusKind::Error),
                    }
                }
            }
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_form(&mut self, code: KeyCode, mut form: RecordForm) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.set_status(format!("{} cancelled.", form.target.title()), StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Tab | KeyCode::Down => form.next_field(),
            KeyCode::BackTab | KeyCode::Up => form.previous_field(),
            KeyCode::Left => {
                form.cycle_choice(false);
            }
            KeyCode::Right => {
                form.cycle_choice(true);
            }
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.submit_form(&form) {
                Ok(message) => {
                    self.set_status(message, StatusKind::Info);
                    keep_open = false;
                }
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        if keep_open {
            return Ok(Mode::Form(form));
        }
        match self.reopen_history.take() {
            Some(student) => Ok(self.open_history(student)),
            None => Ok(Mode::Normal),
        }
    }

    fn handle_confirm_delete(&mut self, code: KeyCode, confirm: ConfirmDelete) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.perform_delete(&confirm) {
                    Ok(message) => {
                        self.set_status(message, StatusKind::Info);
                        Ok(Mode::Normal)
                    }
                    Err(err) => {
                        self.set_status(surface_error(&err), StatusKind::Error);
                        Ok(Mode::Normal)
                    }
                }
            }
            _ => Ok(Mode::ConfirmDelete(confirm)),
        }
    }

    fn handle_confirm_reset(&mut self, code: KeyCode) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Reset cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.perform_reset() {
                    Ok(message) => self.set_status(message, StatusKind::Info),
                    Err(err) => self.set_status(surface_error(&err), StatusKind::Error),
                }
                Ok(Mode::Normal)
            }
            _ => Ok(Mode::ConfirmReset),
        }
    }

    fn handle_search(&mut self, code: KeyCode, mut state: SearchState) -> Result<Mode> {
        let Some(list) = self.active_list() else {
            return Ok(Mode::Normal);
        };

        match code {
            KeyCode::Esc => {
                list.set_filter(None);
                return Ok(Mode::Normal);
            }
            KeyCode::Enter => return Ok(Mode::Normal),
            KeyCode::Up => list.move_selection(-1),
            KeyCode::Down => list.move_selection(1),
            KeyCode::Backspace => {
                state.query.pop();
                list.set_filter(Some(state.query.clone()));
            }
            KeyCode::Char(ch) => {
                state.query.push(ch);
                list.set_filter(Some(state.query.clone()));
            }
            _ => {}
        }
        Ok(Mode::Searching(state))
    }

    fn handle_history(&mut self, code: KeyCode, mut history: StudentPayments) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('q') => return Ok(Mode::Normal),
            KeyCode::Up => history.move_selection(-1),
            KeyCode::Down => history.move_selection(1),
            KeyCode::Char('+') | KeyCode::Char('p') | KeyCode::Char('a') => {
                let form = payment_form(self.students.rows(), None, Some(history.student.id));
                self.reopen_history = Some(history.student);
                return Ok(Mode::Form(form));
            }
            KeyCode::Char('e') | KeyCode::Enter => match history.current() {
                Some(payment) => {
                    let form = payment_form(self.students.rows(), Some(payment), None);
                    self.reopen_history = Some(history.student);
                    return Ok(Mode::Form(form));
                }
                None => self.set_status("No payment selected.", StatusKind::Error),
            },
            _ => {}
        }
        Ok(Mode::StudentPayments(history))
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(TABS_HEIGHT),
                Constraint::Min(0),
                Constraint::Length(footer_height),
            ])
            .split(area);
        let (tabs_area, content_area, footer_area) = (chunks[0], chunks[1], chunks[2]);

        self.draw_tabs(frame, tabs_area);
        match self.tab {
            Tab::Dashboard => self.draw_dashboard(frame, content_area),
            Tab::Students => draw_table(frame, content_area, "Students", &self.students),
            Tab::Employees => draw_table(frame, content_area, "Employees", &self.employees),
            Tab::Classes => draw_table(frame, content_area, "Classes", &self.classes),
            Tab::Payments => draw_table(frame, content_area, "Payments", &self.payments),
        }
        self.draw_footer(frame, footer_area);

        match &self.mode {
            Mode::Form(form) => self.draw_form(frame, area, form),
            Mode::ConfirmDelete(confirm) => self.draw_confirm_delete(frame, area, confirm),
            Mode::ConfirmReset => self.draw_confirm_reset(frame, area),
            Mode::Searching(state) => self.draw_search_bar(frame, content_area, state),
            Mode::StudentPayments(history) => self.draw_history(frame, area, history),
            Mode::Normal => {}
        }
    }

    /// Ask for confirmation before wiping the database.
    fn handle_ctrl_r(&mut self) {
        if matches!(self.mode, Mode::Normal) {
            self.mode = Mode::ConfirmReset;
        }
    }

    /// Refetch every list from the router.
    fn handle_ctrl_l(&mut self) {
        if !matches!(self.mode, Mode::Normal) {
            return;
        }
        match self.reload_all(None) {
            Ok(()) => self.set_status("Refreshed.", StatusKind::Info),
            Err(err) => self.set_status(surface_error(&err), StatusKind::Error),
        }
    }

    fn draw_tabs(&self, frame: &mut Frame, area: Rect) {
        let titles = Tab::ALL
            .iter()
            .enumerate()
            .map(|(idx, tab)| format!("{} {}", idx + 1, tab.title()));
        let tabs = Tabs::new(titles)
            .block(Block::default().borders(Borders::ALL).title("School Manager"))
            .select(self.tab.index())
            .highlight_style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_widget(tabs, area);
    }

    fn draw_dashboard(&self, frame: &mut Frame, area: Rect) {
        let summary = &self.dashboard;
        let label = Style::default().fg(Color::Cyan);
        let stat = |name: &str, value: String| {
            Line::from(vec![
                Span::styled(format!("{name:<20}"), label),
                Span::raw(value),
            ])
        };

        let mut lines = vec![
            stat("Students", summary.students.to_string()),
            stat("Employees", summary.employees.to_string()),
            stat("Classes", summary.classes.to_string()),
            stat("Payments", summary.payments.to_string()),
            Line::from(""),
            stat("Fees expected", format_amount(summary.fees_expected)),
            stat("Fees collected", format_amount(summary.fees_collected)),
            stat("Fees outstanding", format_amount(summary.fees_outstanding)),
            stat("Collection rate", format!("{:.1}%", summary.collection_rate())),
            stat("Payments received", format_amount(summary.payments_total)),
            stat("Monthly payroll", format_amount(summary.monthly_payroll)),
        ];

        if !summary.enrollment.is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Enrollment",
                Style::default().add_modifier(Modifier::BOLD),
            )));
            for (class, count) in &summary.enrollment {
                lines.push(stat(class.as_str(), count.to_string()));
            }
        }

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Overview"))
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions();

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let keys = key_hints;
        match (&self.mode, self.tab) {
            (Mode::Form(_), _) => keys(&[
                ("[Tab/↑↓]", "Field"),
                ("[←→]", "Choose"),
                ("[Enter]", "Save"),
                ("[Esc]", "Cancel"),
            ]),
            (Mode::ConfirmDelete(_), _) | (Mode::ConfirmReset, _) => {
                keys(&[("[Y]", "Confirm"), ("[N/Esc]", "Cancel")])
            }
            (Mode::Searching(_), _) => keys(&[
                ("[Type]", "Filter"),
                ("[↑↓]", "Navigate"),
                ("[Enter]", "Keep"),
                ("[Esc]", "Clear"),
            ]),
            (Mode::StudentPayments(_), _) => keys(&[
                ("[↑↓]", "Navigate"),
                ("[+]", "New Payment"),
                ("[e]", "Edit"),
                ("[Esc]", "Close"),
            ]),
            (Mode::Normal, Tab::Dashboard) => keys(&[
                ("[Tab/1-5]", "Switch"),
                ("[Ctrl+L]", "Refresh"),
                ("[Ctrl+R]", "Reset"),
                ("[q]", "Quit"),
            ]),
            (Mode::Normal, Tab::Students) => keys(&[
                ("[↑↓/PgUp/PgDn]", "Navigate"),
                ("[+]", "Add"),
                ("[e]", "Edit"),
                ("[-]", "Delete"),
                ("[p]", "Payment"),
                ("[Enter]", "History"),
                ("[f]", "Search"),
                ("[s/o]", "Sort"),
                ("[q]", "Quit"),
            ]),
            (Mode::Normal, _) => keys(&[
                ("[↑↓/PgUp/PgDn]", "Navigate"),
                ("[+]", "Add"),
                ("[e]", "Edit"),
                ("[-]", "Delete"),
                ("[f]", "Search"),
                ("[s/o]", "Sort"),
                ("[Tab]", "Switch"),
                ("[q]", "Quit"),
            ]),
        }
    }

    fn draw_search_bar(&self, frame: &mut Frame, area: Rect, state: &SearchState) {
        let height = 3u16.min(area.height);
        let popup_area = Rect {
            x: area.x,
            y: area.y,
            width: area.width,
            height,
        };
        frame.render_widget(Clear, popup_area);

        let block = Block::default().borders(Borders::ALL).title("Search");
        let paragraph = Paragraph::new(Span::raw(format!("Search: {}", state.query)))
            .block(block.clone())
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);

        let inner = block.inner(popup_area);
        let cursor_x = inner.x + "Search: ".len() as u16 + state.query.chars().count() as u16;
        frame.set_cursor_position((cursor_x, inner.y));
    }

    fn draw_form(&self, frame: &mut Frame, area: Rect, form: &RecordForm) {
        let popup_area = centered_rect(70, 80, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(form.target.title())
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        // Two rows stay reserved for the hint or error line.
        let visible = (inner.height as usize).saturating_sub(2).max(1);
        let start = (form.active + 1).saturating_sub(visible);
        let end = (start + visible).min(form.fields.len());

        let mut lines: Vec<Line> = (start..end).map(|idx| form.build_line(idx)).collect();
        lines.push(Line::from(""));
        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save • Tab to switch • ←→ to choose • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines);
        frame.render_widget(paragraph, inner);

        if let Some(offset) = form.cursor_offset() {
            let row = (form.active - start) as u16;
            let cursor_x = (inner.x + offset).min(inner.right().saturating_sub(1));
            frame.set_cursor_position((cursor_x, inner.y + row));
        }
    }

    fn draw_confirm_delete(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmDelete) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Confirm Removal")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(format!(
                "Delete {} #{} ({})?",
                confirm.target.noun(),
                confirm.id,
                confirm.label
            )),
            Line::from(confirm.target.warning()),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_confirm_reset(&self, frame: &mut Frame, area: Rect) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Reset Database")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red));
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from("Delete every student, employee, class, and payment?"),
            Line::from("The schema is rebuilt empty and this cannot be undone."),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_history(&self, frame: &mut Frame, area: Rect, history: &StudentPayments) {
        let popup_area = centered_rect(80, 70, area);
        frame.render_widget(Clear, popup_area);

        let student = &history.student;
        let block = Block::default()
            .title(format!("Payments for {}", student.full_name()))
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Min(0)])
            .split(inner);

        let summary = Paragraph::new(vec![
            Line::from(format!(
                "School fee {}   Paid {}   Balance {}",
                format_amount(student.fields.school_fee),
                format_amount(student.fields.paid_fee),
                format_amount(student.outstanding_fee()),
            )),
            Line::from(format!(
                "{} payment(s) totalling {}",
                history.payments.len(),
                format_amount(history.total_paid()),
            )),
        ]);
        frame.render_widget(summary, chunks[0]);

        if history.payments.is_empty() {
            let message = Paragraph::new("No payments recorded. Press '+' to add one.")
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(message, chunks[1]);
            return;
        }

        let header = Row::new(["Date", "Title", "Amount", "Discount"])
            .style(Style::default().add_modifier(Modifier::BOLD));
        let rows = history.payments.iter().map(|payment| {
            Row::new([
                payment.payment_date.clone(),
                payment.title.clone(),
                format_amount(payment.amount_paid),
                format_amount(payment.discount),
            ])
        });
        let widths = [
            Constraint::Length(12),
            Constraint::Fill(1),
            Constraint::Length(14),
            Constraint::Length(12),
        ];
        let table = Table::new(rows, widths)
            .header(header)
            .row_highlight_style(Style::default().fg(Color::Black).bg(Color::Yellow))
            .highlight_symbol("> ");
        let mut state = TableState::default().with_selected(Some(history.selected));
        frame.render_stateful_widget(table, chunks[1], &mut state);
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn switch_tab(&mut self, tab: Tab) {
        self.tab = tab;
        self.status = None;
    }

    fn active_list(&mut self) -> Option<&mut dyn ListView> {
        match self.tab {
            Tab::Dashboard => None,
            Tab::Students => Some(&mut self.students),
            Tab::Employees => Some(&mut self.employees),
            Tab::Classes => Some(&mut self.classes),
            Tab::Payments => Some(&mut self.payments),
        }
    }

    fn with_list(&mut self, action: impl FnOnce(&mut dyn ListView)) {
        if let Some(list) = self.active_list() {
            action(list);
        }
    }

    fn open_add_form(&mut self) -> Mode {
        let form = match self.tab {
            Tab::Dashboard => return Mode::Normal,
            Tab::Students => student_form(self.classes.rows(), None),
            Tab::Employees => employee_form(None),
            Tab::Classes => class_form(None),
            Tab::Payments => {
                if self.students.rows().is_empty() {
                    self.set_status("Add a student before recording payments.", StatusKind::Error);
                    return Mode::Normal;
                }
                payment_form(self.students.rows(), None, None)
            }
        };
        Mode::Form(form)
    }

    fn open_edit_form(&mut self) -> Mode {
        let form = match self.tab {
            Tab::Dashboard => return Mode::Normal,
            Tab::Students => self
                .students
                .selected_row()
                .map(|student| student_form(self.classes.rows(), Some(student))),
            Tab::Employees => self
                .employees
                .selected_row()
                .map(|employee| employee_form(Some(employee))),
            Tab::Classes => self.classes.selected_row().map(|class| class_form(Some(class))),
            Tab::Payments => self
                .payments
                .selected_row()
                .map(|payment| payment_form(self.students.rows(), Some(payment), None)),
        };
        match form {
            Some(form) => Mode::Form(form),
            None => {
                self.set_status("Nothing selected to edit.", StatusKind::Error);
                Mode::Normal
            }
        }
    }

    fn open_delete_confirm(&mut self) -> Mode {
        let confirm = match self.tab {
            Tab::Dashboard => return Mode::Normal,
            Tab::Payments => {
                self.set_status("Payments cannot be deleted.", StatusKind::Error);
                return Mode::Normal;
            }
            Tab::Students => self.students.selected_row().map(|student| ConfirmDelete {
                target: DeleteTarget::Student,
                id: student.id,
                label: student.full_name(),
            }),
            Tab::Employees => self.employees.selected_row().map(|employee| ConfirmDelete {
                target: DeleteTarget::Employee,
                id: employee.id,
                label: employee.full_name(),
            }),
            Tab::Classes => self.classes.selected_row().map(|class| ConfirmDelete {
                target: DeleteTarget::Class,
                id: class.id,
                label: class.name.clone(),
            }),
        };
        match confirm {
            Some(confirm) => Mode::ConfirmDelete(confirm),
            None => {
                self.set_status("Nothing selected to delete.", StatusKind::Error);
                Mode::Normal
            }
        }
    }

    fn open_history(&mut self, student: Student) -> Mode {
        let student = self
            .students
            .rows()
            .iter()
            .find(|row| row.id == student.id)
            .cloned()
            .unwrap_or(student);

        match self.bridge.call_blocking(GetPayments(StudentRef::new(student.id))) {
            Ok(list) => Mode::StudentPayments(StudentPayments::new(student, list.payments)),
            Err(err) => {
                warn!(student_id = student.id, error = %err, "failed to load payment history");
                self.set_status(err.to_string(), StatusKind::Error);
                Mode::Normal
            }
        }
    }

    /// Send the form to the router and refresh the lists it can affect.
    fn submit_form(&mut self, form: &RecordForm) -> Result<String> {
        let (id, message) = match form.target {
            FormTarget::AddStudent => {
                let created = self.bridge.call_blocking(AddStudent(form.student_fields()?))?;
                (created.id, "Student added.")
            }
            FormTarget::EditStudent(id) => {
                let update = StudentUpdate {
                    id: Some(id),
                    fields: form.student_fields()?,
                };
                let updated = self.bridge.call_blocking(UpdateStudent(update))?;
                (updated.updated_id, "Student updated.")
            }
            FormTarget::AddEmployee => {
                let created = self
                    .bridge
                    .call_blocking(AddEmployee(form.employee_fields()?))?;
                (created.id, "Employee added.")
            }
            FormTarget::EditEmployee(id) => {
                let update = EmployeeUpdate {
                    id: Some(id),
                    fields: form.employee_fields()?,
                };
                let updated = self.bridge.call_blocking(UpdateEmployee(update))?;
                (updated.updated_id, "Employee updated.")
            }
            FormTarget::AddClass => {
                let inserted = self.bridge.call_blocking(AddClass(form.class_input()?))?;
                (inserted.inserted_id, "Class added.")
            }
            FormTarget::EditClass(id) => {
                let input = form.class_input()?;
                let update = ClassUpdate {
                    id: Some(id),
                    name: input.name,
                    class_fees: input.class_fees,
                };
                let updated = self.bridge.call_blocking(UpdateClass(update))?;
                (updated.updated_id, "Class updated. Student fees now follow the new amount.")
            }
            FormTarget::MakePayment => {
                let inserted = self
                    .bridge
                    .call_blocking(MakePayment(form.payment_input()?))?;
                (inserted.inserted_id, "Payment recorded.")
            }
            FormTarget::EditPayment(id) => {
                let update = PaymentUpdate {
                    id: Some(id),
                    fields: form.payment_input()?,
                };
                let updated = self.bridge.call_blocking(EditPayment(update))?;
                (updated.updated_id, "Payment updated.")
            }
        };

        debug!(id, target = ?form.target, "form saved");
        self.reload_all(Some((Tab::for_target(form.target), id)))?;
        Ok(message.to_string())
    }

    fn perform_delete(&mut self, confirm: &ConfirmDelete) -> Result<String> {
        let id = RecordId::new(confirm.id);
        let reply = match confirm.target {
            DeleteTarget::Student => self.bridge.call_blocking(DeleteStudent(id))?,
            DeleteTarget::Employee => self.bridge.call_blocking(DeleteEmployee(id))?,
            DeleteTarget::Class => self.bridge.call_blocking(DeleteClass(id))?,
        };
        self.reload_all(None)?;
        Ok(reply.message)
    }

    fn perform_reset(&mut self) -> Result<String> {
        let reply = self.bridge.call_blocking(ResetDatabase)?;
        self.reload_all(None)?;
        Ok(reply.message)
    }

    /// Refetch every list. `focus` moves the selection of one tab onto a
    /// freshly saved record.
    fn reload_all(&mut self, focus: Option<(Tab, i64)>) -> Result<()> {
        let focus_on = |tab: Tab| focus.and_then(|(t, id)| (t == tab).then_some(id));

        let students = self.bridge.call_blocking(GetStudents)?.students;
        let employees = self.bridge.call_blocking(GetEmployees)?.employees;
        let classes = self.bridge.call_blocking(GetClasses)?.classes;
        let payments = self.bridge.call_blocking(GetAllPayments)?.payments;

        self.students.set_rows(students, focus_on(Tab::Students));
        self.employees.set_rows(employees, focus_on(Tab::Employees));
        self.classes.set_rows(classes, focus_on(Tab::Classes));
        self.payments.set_rows(payments, focus_on(Tab::Payments));

        self.dashboard = DashboardSummary::from_records(
            self.students.rows(),
            self.employees.rows(),
            self.classes.rows(),
            self.payments.rows(),
        );
        Ok(())
    }
}

/// `[key] action` pairs for the footer.
fn key_hints(pairs: &[(&'static str, &'static str)]) -> Line<'static> {
    let key_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let mut spans = Vec::with_capacity(pairs.len() * 2);
    for (idx, (key, action)) in pairs.iter().enumerate() {
        spans.push(Span::styled(*key, key_style));
        let gap = if idx + 1 < pairs.len() { "   " } else { "" };
        spans.push(Span::raw(format!(" {action}{gap}")));
    }
    Line::from(spans)
}

/// Render one page of a record list with its filter, sort, and page in the
/// title.
fn draw_table<T: TableRow>(frame: &mut Frame, area: Rect, title: &str, table: &RecordTable<T>) {
    let mut heading = format!("{title} ({})", table.len());
    if let Some(filter) = table.filter() {
        heading.push_str(&format!(" | search: {filter}"));
    }
    if let Some(sort) = table.sort_label() {
        heading.push_str(&format!(" | sort: {sort}"));
    }
    heading.push_str(&format!(" | page {}/{}", table.page() + 1, table.page_count()));
    let block = Block::default().title(heading).borders(Borders::ALL);

    if table.is_empty() {
        let message = if table.filter().is_some() {
            "No records match the search."
        } else {
            "No records yet. Press '+' to add one."
        };
        let paragraph = Paragraph::new(message)
            .alignment(Alignment::Center)
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    }

    let header = Row::new(T::COLUMNS.iter().map(|column| Cell::from(*column)))
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows = table.page_rows().into_iter().map(|row| Row::new(row.cells()));
    let widths: Vec<Constraint> = T::COLUMNS
        .iter()
        .map(|column| match *column {
            "ID" => Constraint::Length(6),
            _ => Constraint::Fill(1),
        })
        .collect();

    let widget = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(Style::default().fg(Color::Black).bg(Color::Yellow))
        .highlight_symbol("> ");
    let mut state = TableState::default().with_selected(table.selected_on_page());
    frame.render_stateful_widget(widget, area, &mut state);
}
