//! Plain-text rendering of the todo list.

use crate::screens::ListView;
use todo_items::Item;

pub const HEADER: &str = "My Todo List";
pub const LOADING: &str = "Loading todos...";
pub const EMPTY_TITLE: &str = "No todos yet!";
pub const EMPTY_HINT: &str = "Add your first todo above to get started";

/// One line per item, numbered from 1 in display order.
pub fn render_list(view: &ListView) -> String {
    match view {
        ListView::Loading => LOADING.to_string(),
        ListView::Ready(items) if items.is_empty() => format!("{}\n{}", EMPTY_TITLE, EMPTY_HINT),
        ListView::Ready(items) => items
            .iter()
            .enumerate()
            .map(|(index, item)| render_item(index + 1, item))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

pub fn render_item(position: usize, item: &Item) -> String {
    let mark = if item.completed { 'x' } else { ' ' };
    format!(
        "{:>3}. [{}] {}  ({})",
        position,
        mark,
        item.title,
        item.created_at.format("%Y-%m-%d %H:%M")
    )
}

/// Header plus list, as the shell prints it after every push.
pub fn render_screen(user: &str, view: &ListView) -> String {
    format!("{} ({})\n{}\n{}", HEADER, user, "-".repeat(HEADER.len()), render_list(view))
}
