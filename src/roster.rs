//! Batches and their students.

use crate::error::AttendError;
use crate::model::{Batch, NewStudent, Student};
use crate::store::{self, RecordStore};
use chrono::Utc;
use uuid::Uuid;

/// Roster text beyond this many characters is ignored on import.
pub const IMPORT_TEXT_LIMIT: usize = 15_000;

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

pub fn list_batches(store: &dyn RecordStore) -> Result<Vec<Batch>, AttendError> {
    Ok(store::get::<Batch>(store)?)
}

pub fn find_batch(store: &dyn RecordStore, batch_id: &str) -> Result<Batch, AttendError> {
    list_batches(store)?
        .into_iter()
        .find(|b| b.id == batch_id)
        .ok_or_else(|| AttendError::not_found("batch", batch_id))
}

pub fn create_batch(
    store: &dyn RecordStore,
    name: &str,
    description: Option<String>,
) -> Result<Batch, AttendError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AttendError::Validation("name must not be empty".to_string()));
    }
    let batch = Batch {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        description: non_empty(description),
        created_at: Utc::now().to_rfc3339(),
    };
    let mut batches = list_batches(store)?;
    batches.push(batch.clone());
    store::put(store, &batches)?;
    tracing::info!(batch_id = %batch.id, name = %batch.name, "batch created");
    Ok(batch)
}

pub fn all_students(store: &dyn RecordStore) -> Result<Vec<Student>, AttendError> {
    Ok(store::get::<Student>(store)?)
}

/// Students of one batch in roster order.
pub fn list_students(store: &dyn RecordStore, batch_id: &str) -> Result<Vec<Student>, AttendError> {
    Ok(all_students(store)?
        .into_iter()
        .filter(|s| s.batch_id == batch_id)
        .collect())
}

pub fn add_students(
    store: &dyn RecordStore,
    batch_id: &str,
    new_students: Vec<NewStudent>,
) -> Result<Vec<Student>, AttendError> {
    find_batch(store, batch_id)?;
    let mut created = Vec::with_capacity(new_students.len());
    for (i, ns) in new_students.into_iter().enumerate() {
        let name = ns.name.trim().to_string();
        if name.is_empty() {
            return Err(AttendError::Validation(format!(
                "student {} has an empty name",
                i + 1
            )));
        }
        created.push(Student {
            id: Uuid::new_v4().to_string(),
            name,
            email: non_empty(ns.email),
            photo_url: non_empty(ns.photo_url),
            batch_id: batch_id.to_string(),
        });
    }
    if created.is_empty() {
        return Ok(created);
    }
    let mut all = store::get::<Student>(store)?;
    all.extend(created.iter().cloned());
    store::put(store, &all)?;
    tracing::info!(batch_id, count = created.len(), "students added");
    Ok(created)
}

pub fn update_student_photo(
    store: &dyn RecordStore,
    student_id: &str,
    photo_url: &str,
) -> Result<(), AttendError> {
    let mut all = store::get::<Student>(store)?;
    let Some(student) = all.iter_mut().find(|s| s.id == student_id) else {
        return Err(AttendError::not_found("student", student_id));
    };
    student.photo_url = non_empty(Some(photo_url.to_string()));
    store::put(store, &all)?;
    Ok(())
}

fn clean_cell(cell: &str) -> &str {
    cell.trim().trim_matches(|c| c == '"' || c == '\'').trim()
}

/// Parse pasted CSV or plain text into students, one per line.
pub fn parse_roster_text(text: &str) -> Vec<NewStudent> {
    let text: String = text.chars().take(IMPORT_TEXT_LIMIT).collect();
    let mut out = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let cells: Vec<&str> = line
            .split([',', '\t', ';'])
            .map(clean_cell)
            .filter(|c| !c.is_empty())
            .collect();
        if cells.is_empty() {
            continue;
        }
        if line_no == 0 && cells[0].eq_ignore_ascii_case("name") {
            continue;
        }
        let email = cells.iter().find(|c| c.contains('@')).map(|c| c.to_string());
        let Some(name) = cells.iter().find(|c| !c.contains('@')) else {
            continue;
        };
        out.push(NewStudent {
            name: name.to_string(),
            email,
            photo_url: None,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn named(name: &str) -> NewStudent {
        NewStudent {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn create_batch_trims_and_rejects_empty_names() {
        let store = MemoryStore::new();
        let b = create_batch(&store, "  CS 2024 - A ", Some("  ".to_string())).expect("create");
        assert_eq!(b.name, "CS 2024 - A");
        assert_eq!(b.description, None);
        assert!(matches!(
            create_batch(&store, "   ", None),
            Err(AttendError::Validation(_))
        ));
        assert_eq!(list_batches(&store).expect("list").len(), 1);
    }

    #[test]
    fn batch_ids_are_unique() {
        let store = MemoryStore::new();
        let a = create_batch(&store, "A", None).expect("a");
        let b = create_batch(&store, "B", None).expect("b");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn students_keep_roster_order_and_stay_in_their_batch() {
        let store = MemoryStore::new();
        let a = create_batch(&store, "A", None).expect("a");
        let b = create_batch(&store, "B", None).expect("b");
        add_students(&store, &a.id, vec![named("Zed"), named("Amy")]).expect("add a");
        add_students(&store, &b.id, vec![named("Bob")]).expect("add b");
        add_students(&store, &a.id, vec![named("Cal")]).expect("add a again");

        let names: Vec<String> = list_students(&store, &a.id)
            .expect("list")
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Zed", "Amy", "Cal"]);
        assert_eq!(list_students(&store, &b.id).expect("list").len(), 1);
    }

    #[test]
    fn add_students_requires_existing_batch() {
        let store = MemoryStore::new();
        let e = add_students(&store, "nope", vec![named("Amy")]).unwrap_err();
        assert_eq!(e.code(), "not_found");
    }

    #[test]
    fn photo_update_is_last_write_wins() {
        let store = MemoryStore::new();
        let a = create_batch(&store, "A", None).expect("a");
        let s = add_students(&store, &a.id, vec![named("Amy")]).expect("add");
        update_student_photo(&store, &s[0].id, "data:one").expect("first");
        update_student_photo(&store, &s[0].id, "data:two").expect("second");
        let stored = list_students(&store, &a.id).expect("list");
        assert_eq!(stored[0].photo_url.as_deref(), Some("data:two"));
        assert!(matches!(
            update_student_photo(&store, "missing", "x"),
            Err(AttendError::NotFound { .. })
        ));
    }

    #[test]
    fn parse_roster_text_handles_header_emails_and_separators() {
        let text = "Name,Email\n\"Ada Lovelace\", ada@example.com\n\nalan@example.com;Alan Turing\nGrace Hopper\t\n";
        let parsed = parse_roster_text(text);
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[0].name, "Ada Lovelace");
        assert_eq!(parsed[0].email.as_deref(), Some("ada@example.com"));
        assert_eq!(parsed[1].name, "Alan Turing");
        assert_eq!(parsed[1].email.as_deref(), Some("alan@example.com"));
        assert_eq!(parsed[2].name, "Grace Hopper");
        assert_eq!(parsed[2].email, None);
    }

    #[test]
    fn parse_roster_text_skips_email_only_lines() {
        let parsed = parse_roster_text("only@example.com\nRealName\n");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].name, "RealName");
    }
}
