use crate::input::Action;
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SelectMode {
    Single,
    Multi,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerCommand {
    None,
    Accept(Vec<usize>),
    Cancel,
}

#[derive(Debug, Clone)]
pub struct PickerItem {
    pub label: String,
    pub preview: String,
}

pub struct App {
    items: Vec<PickerItem>,
    mode: SelectMode,
    query: String,
    matches: Vec<usize>,
    cursor: usize,
    marked: BTreeSet<usize>,
    page_size: usize,
    matcher: SkimMatcherV2,
}

impl App {
    pub fn new(items: Vec<PickerItem>, mode: SelectMode) -> Self {
        let mut app = Self {
            items,
            mode,
            query: String::new(),
            matches: Vec::new(),
            cursor: 0,
            marked: BTreeSet::new(),
            page_size: 10,
            matcher: SkimMatcherV2::default(),
        };
        app.refresh_matches();
        app
    }

    pub fn mode(&self) -> SelectMode {
        self.mode
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn item(&self, index: usize) -> Option<&PickerItem> {
        self.items.get(index)
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn matches(&self) -> &[usize] {
        &self.matches
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_marked(&self, index: usize) -> bool {
        self.marked.contains(&index)
    }

    pub fn marked_count(&self) -> usize {
        self.marked.len()
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.matches.get(self.cursor).copied()
    }

    pub fn set_page_size(&mut self, rows: usize) {
        self.page_size = rows.max(1);
    }

    pub fn apply_action(&mut self, action: Action) -> PickerCommand {
        match action {
            Action::Up => self.move_cursor(-1),
            Action::Down => self.move_cursor(1),
            Action::PageUp => self.move_cursor(-(self.page_size as isize)),
            Action::PageDown => self.move_cursor(self.page_size as isize),
            Action::Top => self.cursor = 0,
            Action::Bottom => self.cursor = self.matches.len().saturating_sub(1),
            Action::ToggleMark => self.toggle_mark(),
            Action::Accept => return self.accept(),
            Action::Cancel => return PickerCommand::Cancel,
            Action::Backspace => {
                if self.query.pop().is_some() {
                    self.refresh_matches();
                }
            }
            Action::ClearQuery => {
                if !self.query.is_empty() {
                    self.query.clear();
                    self.refresh_matches();
                }
            }
            Action::InputChar(c) => {
                self.query.push(c);
                self.refresh_matches();
            }
        }
        PickerCommand::None
    }

    fn accept(&self) -> PickerCommand {
        match self.mode {
            SelectMode::Single => match self.highlighted() {
                Some(index) => PickerCommand::Accept(vec![index]),
                None => PickerCommand::None,
            },
            SelectMode::Multi if !self.marked.is_empty() => {
                PickerCommand::Accept(self.marked.iter().copied().collect())
            }
            SelectMode::Multi => PickerCommand::Accept(self.highlighted().into_iter().collect()),
        }
    }

    fn toggle_mark(&mut self) {
        if self.mode != SelectMode::Multi {
            return;
        }
        let Some(index) = self.highlighted() else {
            return;
        };
        if !self.marked.remove(&index) {
            self.marked.insert(index);
        }
        self.move_cursor(1);
    }

    fn move_cursor(&mut self, delta: isize) {
        if self.matches.is_empty() {
            self.cursor = 0;
            return;
        }
        let last = self.matches.len() - 1;
        self.cursor = self.cursor.saturating_add_signed(delta).min(last);
    }

    fn refresh_matches(&mut self) {
        if self.query.is_empty() {
            self.matches = (0..self.items.len()).collect();
        } else {
            let mut scored = self
                .items
                .iter()
                .enumerate()
                .filter_map(|(index, item)| {
                    self.matcher
                        .fuzzy_match(&item.label, &self.query)
                        .map(|score| (index, score))
                })
                .collect::<Vec<_>>();
            // Stable sort keeps the original order among equal scores.
            scored.sort_by(|a, b| b.1.cmp(&a.1));
            self.matches = scored.into_iter().map(|(index, _)| index).collect();
        }
        self.cursor = self.cursor.min(self.matches.len().saturating_sub(1));
    }
}
