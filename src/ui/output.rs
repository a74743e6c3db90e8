use crate::entity::Entity;
use crate::fact::Fact;
use crate::lesson::{Lesson, Outcome};
use crate::output::is_quiet;
use crate::ui::{Icons, theme};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}", Icons::BRAIN, text.style(theme().header.clone()));
}

pub fn status(icon: &str, label: &str, value: &str) {
    if is_quiet() {
        return;
    }
    println!("{} {}: {}", icon, label.style(theme().dim.clone()), value);
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn section(title: &str) {
    if is_quiet() {
        return;
    }
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn dim(text: &str) -> String {
    text.style(theme().dim.clone()).to_string()
}

pub fn muted(text: &str) -> String {
    text.style(theme().muted.clone()).to_string()
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(theme().dim.clone()), value);
}

/// `[id] content #tag (rank)`, with superseded facts marked
pub fn fact_line(fact: &Fact, rank: Option<f64>) {
    let id = format!("[{}]", fact.id);
    let mut line = format!("{} {}", id.style(theme().id.clone()), fact.content);

    for tag in &fact.tags {
        line.push(' ');
        line.push_str(&format!("#{}", tag).style(theme().tag.clone()).to_string());
    }
    if let Some(rank) = rank {
        line.push_str(&format!(" {}", muted(&format!("(rank {:.3})", rank))));
    }
    if let Some(next) = fact.superseded_by {
        line.push_str(&format!(" {} {}", Icons::LINK, muted(&format!("superseded by #{}", next))));
    }

    println!("{}", line);
}

/// `🟢 [success] insight`, followed by the action and context
pub fn lesson_line(lesson: &Lesson) {
    let icon = match lesson.outcome {
        Outcome::Success => Icons::SUCCESS,
        Outcome::Failure => Icons::FAILURE,
        Outcome::Other(_) => Icons::OTHER,
    };
    println!(
        "{} [{}] {}",
        icon,
        lesson.outcome.as_str().style(theme().id.clone()),
        lesson.insight
    );

    let mut detail = format!("action: {}", lesson.action);
    if let Some(context) = &lesson.context {
        detail.push_str(&format!(", context: {}", context));
    }
    println!("   {}", dim(&detail));
}

pub fn entity_block(entity: &Entity) {
    println!(
        "{} {} {}",
        Icons::PERSON,
        entity.name.style(theme().header.clone()),
        muted(&format!("({})", entity.id))
    );
    for (key, value) in &entity.attributes {
        summary_row(&format!("{}:", key), &value.to_string());
    }
    summary_row("updated:", &entity.updated_at.to_rfc3339());

    if let Some(facts) = &entity.facts {
        if facts.is_empty() {
            println!("  {} {}", Icons::EMPTY, dim("no linked facts"));
        }
        for fact in facts {
            print!("  ");
            fact_line(fact, None);
        }
    }
}
