use std::cmp::Ordering;

use crate::models::{Employee, Payment, SchoolClass, Student};

use super::helpers::format_amount;

/// Rows shown on a single page of a record list.
pub(crate) const PAGE_SIZE: usize = 15;

/// A record that can be shown as one row of a list screen.
pub(crate) trait TableRow: Clone {
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> i64;

    /// One display string per entry in `COLUMNS`.
    fn cells(&self) -> Vec<String>;
}

impl TableRow for Student {
    const COLUMNS: &'static [&'static str] = &[
        "ID", "Name", "Class", "Reg. No", "School Fee", "Paid", "Balance", "Parent Phone",
    ];

    fn id(&self) -> i64 {
        self.id
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.full_name(),
            self.class_name.clone().unwrap_or_else(|| "-".to_string()),
            self.fields.registration_number.clone(),
            format_amount(self.fields.school_fee),
            format_amount(self.fields.paid_fee),
            format_amount(self.outstanding_fee()),
            self.fields.parent_phone.clone(),
        ]
    }
}

impl TableRow for Employee {
    const COLUMNS: &'static [&'static str] = &["ID", "Name", "Role", "Salary", "Joined", "Phone"];

    fn id(&self) -> i64 {
        self.id
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.full_name(),
            self.fields.role.clone(),
            format_amount(self.fields.salary),
            self.fields.join_date.clone(),
            self.fields.phone.clone(),
        ]
    }
}

impl TableRow for SchoolClass {
    const COLUMNS: &'static [&'static str] = &["ID", "Name", "Fees"];

    fn id(&self) -> i64 {
        self.id
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            format_amount(self.class_fees),
        ]
    }
}

impl TableRow for Payment {
    const COLUMNS: &'static [&'static str] =
        &["ID", "Date", "Student", "Title", "Amount", "Discount"];

    fn id(&self) -> i64 {
        self.id
    }

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.payment_date.clone(),
            self.student_name
                .clone()
                .unwrap_or_else(|| format!("#{} (deleted)", self.student_id)),
            self.title.clone(),
            format_amount(self.amount_paid),
            format_amount(self.discount),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SortOrder {
    pub(crate) column: usize,
    pub(crate) descending: bool,
}

/// Compare two display cells, numerically when both parse as numbers.
fn compare_cells(a: &str, b: &str) -> Ordering {
    let parse = |cell: &str| cell.replace(',', "").trim().parse::<f64>().ok();
    match (parse(a), parse(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.to_lowercase().cmp(&b.to_lowercase()),
    }
}

/// Client-side view over a fetched record list: search filter, column sort,
/// and pagination. The underlying rows are replaced wholesale on refresh.
pub(crate) struct RecordTable<T> {
    rows: Vec<T>,
    visible: Vec<usize>,
    filter: Option<String>,
    sort: Option<SortOrder>,
    selected: usize,
}

impl<T: TableRow> RecordTable<T> {
    pub(crate) fn new(rows: Vec<T>) -> Self {
        let mut table = Self {
            rows,
            visible: Vec::new(),
            filter: None,
            sort: None,
            selected: 0,
        };
        table.rebuild();
        table
    }

    /// Swap in freshly fetched rows, keeping the selection on `focus_id` when
    /// it is still visible.
    pub(crate) fn set_rows(&mut self, rows: Vec<T>, focus_id: Option<i64>) {
        let keep = focus_id.or_else(|| self.selected_row().map(TableRow::id));
        self.rows = rows;
        self.rebuild();
        if let Some(id) = keep {
            self.select_id(id);
        }
    }

    pub(crate) fn rows(&self) -> &[T] {
        &self.rows
    }

    pub(crate) fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub(crate) fn set_filter(&mut self, filter: Option<String>) {
        self.filter = filter.filter(|q| !q.trim().is_empty());
        self.selected = 0;
        self.rebuild();
    }

    /// Move the sort to the next column, wrapping back to the default order.
    pub(crate) fn cycle_sort_column(&mut self) {
        self.sort = match self.sort {
            None => Some(SortOrder {
                column: 0,
                descending: false,
            }),
            Some(order) if order.column + 1 < T::COLUMNS.len() => Some(SortOrder {
                column: order.column + 1,
                descending: order.descending,
            }),
            Some(_) => None,
        };
        self.rebuild();
    }

    pub(crate) fn toggle_sort_direction(&mut self) {
        if let Some(order) = self.sort.as_mut() {
            order.descending = !order.descending;
            self.rebuild();
        }
    }

    pub(crate) fn sort_label(&self) -> Option<String> {
        self.sort.map(|order| {
            let arrow = if order.descending { "desc" } else { "asc" };
            format!("{} {arrow}", T::COLUMNS[order.column])
        })
    }

    /// Number of rows left after filtering.
    pub(crate) fn len(&self) -> usize {
        self.visible.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    pub(crate) fn selected_row(&self) -> Option<&T> {
        self.visible.get(self.selected).map(|&idx| &self.rows[idx])
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        if self.visible.is_empty() {
            return;
        }
        let last = self.visible.len() as isize - 1;
        self.selected = (self.selected as isize + offset).clamp(0, last) as usize;
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.visible.len().saturating_sub(1);
    }

    pub(crate) fn next_page(&mut self) {
        self.move_selection(PAGE_SIZE as isize);
        if !self.visible.is_empty() {
            // Land on the first row of the new page.
            self.selected = self.page() * PAGE_SIZE;
        }
    }

    pub(crate) fn previous_page(&mut self) {
        let page = self.page();
        self.selected = page.saturating_sub(1) * PAGE_SIZE;
    }

    /// Zero-based page holding the selection.
    pub(crate) fn page(&self) -> usize {
        self.selected / PAGE_SIZE
    }

    pub(crate) fn page_count(&self) -> usize {
        self.visible.len().div_ceil(PAGE_SIZE).max(1)
    }

    /// Rows on the current page, in display order.
    pub(crate) fn page_rows(&self) -> Vec<&T> {
        let start = self.page() * PAGE_SIZE;
        self.visible
            .iter()
            .skip(start)
            .take(PAGE_SIZE)
            .map(|&idx| &self.rows[idx])
            .collect()
    }

    /// Position of the selection within the current page.
    pub(crate) fn selected_on_page(&self) -> Option<usize> {
        if self.visible.is_empty() {
            None
        } else {
            Some(self.selected % PAGE_SIZE)
        }
    }

    fn select_id(&mut self, id: i64) {
        if let Some(pos) = self.visible.iter().position(|&idx| self.rows[idx].id() == id) {
            self.selected = pos;
        }
    }

    fn rebuild(&mut self) {
        let needle = self.filter.as_ref().map(|q| q.trim().to_lowercase());
        let cells: Vec<Vec<String>> = self.rows.iter().map(TableRow::cells).collect();

        self.visible = (0..self.rows.len())
            .filter(|&idx| match &needle {
                Some(needle) => cells[idx]
                    .iter()
                    .any(|cell| cell.to_lowercase().contains(needle.as_str())),
                None => true,
            })
            .collect();

        if let Some(order) = self.sort {
            self.visible.sort_by(|&a, &b| {
                let ordering = compare_cells(&cells[a][order.column], &cells[b][order.column]);
                if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        if self.visible.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.visible.len() {
            self.selected = self.visible.len() - 1;
        }
    }
}

/// Row-type independent controls, so key handling can drive whichever list
/// tab is active.
pub(crate) trait ListView {
    fn move_selection(&mut self, offset: isize);
    fn select_first(&mut self);
    fn select_last(&mut self);
    fn next_page(&mut self);
    fn previous_page(&mut self);
    fn cycle_sort_column(&mut self);
    fn toggle_sort_direction(&mut self);
    fn filter(&self) -> Option<&str>;
    fn set_filter(&mut self, filter: Option<String>);
}

impl<T: TableRow> ListView for RecordTable<T> {
    fn move_selection(&mut self, offset: isize) {
        RecordTable::move_selection(self, offset)
    }

    fn select_first(&mut self) {
        RecordTable::select_first(self)
    }

    fn select_last(&mut self) {
        RecordTable::select_last(self)
    }

    fn next_page(&mut self) {
        RecordTable::next_page(self)
    }

    fn previous_page(&mut self) {
        RecordTable::previous_page(self)
    }

    fn cycle_sort_column(&mut self) {
        RecordTable::cycle_sort_column(self)
    }

    fn toggle_sort_direction(&mut self) {
        RecordTable::toggle_sort_direction(self)
    }

    fn filter(&self) -> Option<&str> {
        RecordTable::filter(self)
    }

    fn set_filter(&mut self, filter: Option<String>) {
        RecordTable::set_filter(self, filter)
    }
}

/// Payment history popup for one student.
pub(crate) struct StudentPayments {
    pub(crate) student: Student,
    pub(crate) payments: Vec<Payment>,
    pub(crate) selected: usize,
}

impl StudentPayments {
    pub(crate) fn new(student: Student, payments: Vec<Payment>) -> Self {
        Self {
            student,
            payments,
            selected: 0,
        }
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        if self.payments.is_empty() {
            return;
        }
        let last = self.payments.len() as isize - 1;
        self.selected = (self.selected as isize + offset).clamp(0, last) as usize;
    }

    pub(crate) fn current(&self) -> Option<&Payment> {
        self.payments.get(self.selected)
    }

    pub(crate) fn total_paid(&self) -> f64 {
        self.payments.iter().map(|p| p.amount_paid).sum()
    }
}
