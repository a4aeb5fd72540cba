use std::fmt;
use std::sync::OnceLock;

/// Placeholder lists for small column counts, shared by every table.
const PARAMS: [&str; 11] = [
    "",
    "?",
    "?,?",
    "?,?,?",
    "?,?,?,?",
    "?,?,?,?,?",
    "?,?,?,?,?,?",
    "?,?,?,?,?,?,?",
    "?,?,?,?,?,?,?,?",
    "?,?,?,?,?,?,?,?,?",
    "?,?,?,?,?,?,?,?,?,?",
];

/// Textual rendering of the columns selected by one field-set.
///
/// The empty and single-column cases are by far the most common (primary key
/// lookups, single-field updates) and skip the column vector entirely.
#[derive(Debug)]
pub enum Cols {
    Empty,
    Single { name: String, paramed: String },
    Multiple(MultiCols),
}

/// Two or more columns with lazily memoized renderings.
#[derive(Debug)]
pub struct MultiCols {
    cols: Vec<String>,
    joined: OnceLock<String>,
    paramed: OnceLock<String>,
    only_param: OnceLock<String>,
}

impl Cols {
    /// Build the projection for an ordered column list.
    #[must_use]
    pub fn new(mut cols: Vec<String>) -> Self {
        match cols.len() {
            0 => Cols::Empty,
            1 => Cols::single(cols.swap_remove(0)),
            _ => Cols::Multiple(MultiCols {
                cols,
                joined: OnceLock::new(),
                paramed: OnceLock::new(),
                only_param: OnceLock::new(),
            }),
        }
    }

    #[must_use]
    pub fn single(name: String) -> Self {
        let paramed = format!("{name}=?");
        Cols::Single { name, paramed }
    }

    /// Columns joined with `,`: `a,b,c`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Cols::Empty => "",
            Cols::Single { name, .. } => name.as_str(),
            Cols::Multiple(multi) => multi.joined.get_or_init(|| multi.cols.join(",")).as_str(),
        }
    }

    /// Columns with `=?` appended: `a=?,b=?,c=?`.
    #[must_use]
    pub fn paramed(&self) -> &str {
        match self {
            Cols::Empty => "",
            Cols::Single { paramed, .. } => paramed.as_str(),
            Cols::Multiple(multi) => multi
                .paramed
                .get_or_init(|| join(&multi.cols, "=?", ","))
                .as_str(),
        }
    }

    /// One placeholder per column: `?,?,?`.
    #[must_use]
    pub fn only_param(&self) -> &str {
        match self {
            Cols::Empty => PARAMS[0],
            Cols::Single { .. } => PARAMS[1],
            Cols::Multiple(multi) => match PARAMS.get(multi.cols.len()) {
                Some(params) => *params,
                None => multi
                    .only_param
                    .get_or_init(|| vec!["?"; multi.cols.len()].join(","))
                    .as_str(),
            },
        }
    }

    /// Append `suffix` to every column and join them with `sep`.
    #[must_use]
    pub fn join(&self, suffix: &str, sep: &str) -> String {
        match self {
            Cols::Empty => String::new(),
            Cols::Single { name, .. } => format!("{name}{suffix}"),
            Cols::Multiple(multi) => join(&multi.cols, suffix, sep),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Cols::Empty => 0,
            Cols::Single { .. } => 1,
            Cols::Multiple(multi) => multi.cols.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Cols::Empty)
    }
}

impl fmt::Display for Cols {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn join(cols: &[String], suffix: &str, sep: &str) -> String {
    let capacity = cols
        .iter()
        .map(|c| c.len() + suffix.len() + sep.len())
        .sum();
    let mut out = String::with_capacity(capacity);
    for (i, col) in cols.iter().enumerate() {
        if i > 0 {
            out.push_str(sep);
        }
        out.push_str(col);
        out.push_str(suffix);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| (*c).to_string()).collect()
    }

    #[test]
    fn multiple_columns() {
        let cols = Cols::new(names(&["id", "age", "name"]));
        assert_eq!(cols.len(), 3);
        assert_eq!(cols.only_param(), "?,?,?");
        assert_eq!(cols.as_str(), "id,age,name");
        assert_eq!(cols.paramed(), "id=?,age=?,name=?");
        assert_eq!(cols.join("=?", " AND "), "id=? AND age=? AND name=?");
    }

    #[test]
    fn single_column() {
        let cols = Cols::new(names(&["id"]));
        assert!(matches!(cols, Cols::Single { .. }));
        assert_eq!(cols.len(), 1);
        assert_eq!(cols.only_param(), "?");
        assert_eq!(cols.as_str(), "id");
        assert_eq!(cols.paramed(), "id=?");
        assert_eq!(cols.join("=?", " AND "), "id=?");
    }

    #[test]
    fn empty_columns() {
        let cols = Cols::new(Vec::new());
        assert!(cols.is_empty());
        assert_eq!(cols.len(), 0);
        assert_eq!(cols.only_param(), "");
        assert_eq!(cols.as_str(), "");
        assert_eq!(cols.paramed(), "");
        assert_eq!(cols.join("=?", ","), "");
    }

    #[test]
    fn single_matches_general_rendering() {
        let single = Cols::single("name".into());
        let general = MultiCols {
            cols: names(&["name"]),
            joined: OnceLock::new(),
            paramed: OnceLock::new(),
            only_param: OnceLock::new(),
        };
        let general = Cols::Multiple(general);
        assert_eq!(single.as_str(), general.as_str());
        assert_eq!(single.paramed(), general.paramed());
        assert_eq!(single.only_param(), general.only_param());
        assert_eq!(single.join("+1", ";"), general.join("+1", ";"));
        assert_eq!(single.len(), general.len());
    }

    #[test]
    fn wide_placeholder_lists_are_built() {
        let cols = Cols::new((0..12).map(|i| format!("c{i}")).collect());
        assert_eq!(cols.only_param(), vec!["?"; 12].join(","));
        // memoized: same allocation on the second call
        assert!(std::ptr::eq(cols.only_param(), cols.only_param()));
    }
}
