use chrono::Utc;

use super::*;

fn sample_row(skills: &str) -> JobPostingRow {
    JobPostingRow {
        url: "https://jobs.example.com/1".to_string(),
        title: "Senior Backend Engineer".to_string(),
        company: "Acme".to_string(),
        location: UNKNOWN.to_string(),
        raw_text: "Go and SQL".to_string(),
        skills: skills.to_string(),
        source: "example".to_string(),
        fetched_at: Utc::now().naive_utc(),
    }
}

#[test]
fn upsert_outcome_display() {
    assert_eq!(UpsertOutcome::Inserted.to_string(), "Inserted");
    assert_eq!(UpsertOutcome::Updated.to_string(), "Updated");
    assert_eq!(UpsertOutcome::Unchanged.to_string(), "Unchanged");
    assert!(UpsertOutcome::Inserted.is_change());
    assert!(!UpsertOutcome::Unchanged.is_change());
}

#[test]
fn row_conversion_parses_skills() {
    let posting =
        JobPosting::try_from(sample_row(r#"["go","sql"]"#)).expect("row should convert");
    assert_eq!(posting.skills.len(), 2);
    assert!(posting.skills.contains("go"));
    assert_eq!(posting.location, UNKNOWN);
}

#[test]
fn row_conversion_rejects_corrupt_skills() {
    let result = JobPosting::try_from(sample_row("not json"));
    assert!(result.is_err());
}

#[test]
fn same_content_ignores_timestamp() {
    let posting = JobPosting::try_from(sample_row(r#"["go"]"#)).expect("row should convert");
    let new_posting = NewJobPosting {
        url: posting.url.clone(),
        title: posting.title.clone(),
        company: posting.company.clone(),
        location: posting.location.clone(),
        raw_text: posting.raw_text.clone(),
        skills: posting.skills.clone(),
        source: posting.source.clone(),
    };
    assert!(new_posting.same_content_as(&posting));

    let retitled = NewJobPosting {
        title: "Staff Backend Engineer".to_string(),
        ..new_posting
    };
    assert!(!retitled.same_content_as(&posting));
}

#[test]
fn refresh_run_failure_detection() {
    let now = Utc::now().naive_utc();
    let run = RefreshRun {
        id: 1,
        started_at: now,
        finished_at: now,
        sources_total: 3,
        sources_failed: 3,
        postings_written: 0,
        postings_changed: 0,
    };
    assert!(run.all_sources_failed());

    let partial = RefreshRun {
        sources_failed: 1,
        ..run.clone()
    };
    assert!(!partial.all_sources_failed());

    let empty = RefreshRun {
        sources_total: 0,
        sources_failed: 0,
        ..run
    };
    assert!(!empty.all_sources_failed());
}
