use crate::storage::MemoryStats;
use tabled::{Table, Tabled, settings::Style};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Store")]
    pub metric: String,
    #[tabled(rename = "Count")]
    pub value: String,
}

#[derive(Default)]
pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

pub fn stats_table(stats: &MemoryStats) -> String {
    let mut builder = TableBuilder::new();
    builder.add_row("Facts (live)", &stats.facts.to_string());
    builder.add_row("Lessons", &stats.lessons.to_string());
    builder.add_row("Entities", &stats.entities.to_string());
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_builder_renders_nothing() {
        assert!(TableBuilder::new().build().is_empty());
    }

    #[test]
    fn test_stats_table_lists_every_store() {
        let table = stats_table(&MemoryStats { facts: 2, lessons: 1, entities: 0 });
        assert!(table.contains("Facts (live)"));
        assert!(table.contains("Lessons"));
        assert!(table.contains("Entities"));
        assert!(table.contains('2'));
    }
}
