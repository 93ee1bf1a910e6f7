use super::*;

fn set(terms: &[&str]) -> BTreeSet<String> {
    terms.iter().map(|t| (*t).to_string()).collect()
}

#[test]
fn extracts_whole_words_case_insensitively() {
    let extractor = SkillExtractor::new(["Go", "SQL", "React"]).expect("vocabulary compiles");
    let found = extractor.extract("We use GO and PostgreSQL, plus plain sql for reports.");
    assert_eq!(found, set(&["go", "sql"]));
}

#[test]
fn java_does_not_match_inside_javascript() {
    let extractor = SkillExtractor::new(["java", "javascript"]).expect("vocabulary compiles");

    assert_eq!(
        extractor.extract("Strong JavaScript background"),
        set(&["javascript"])
    );
    assert_eq!(
        extractor.extract("Java and JavaScript developers welcome"),
        set(&["java", "javascript"])
    );
}

#[test]
fn punctuated_terms_match() {
    let extractor = SkillExtractor::default();
    let found = extractor.extract("Stack: C++, Node.js, Docker; Kubernetes (nice to have).");
    assert_eq!(found, set(&["c++", "docker", "kubernetes", "node.js"]));
}

#[test]
fn multi_word_and_accented_terms_match() {
    let extractor = SkillExtractor::default();
    let found = extractor
        .extract("Expérience en Machine Learning et en Cybersécurité; gestion de projet agile.");
    assert_eq!(
        found,
        set(&["agile", "cybersécurité", "gestion de projet", "machine learning"])
    );
}

#[test]
fn no_terms_yields_empty_set() {
    let extractor = SkillExtractor::default();
    assert!(extractor.extract("Friendly bakery looking for a morning baker").is_empty());
    assert!(extractor.extract("").is_empty());
}

#[test]
fn results_are_subset_of_vocabulary() {
    let vocabulary = ["rust", "sql", "aws"];
    let found = extract("Rust services on AWS, trusted by rustaceans", &vocabulary)
        .expect("extraction succeeds");

    assert_eq!(found, set(&["aws", "rust"]));
    for term in &found {
        assert!(vocabulary.contains(&term.as_str()));
    }
}

#[test]
fn vocabulary_is_normalized_and_deduplicated() {
    let extractor =
        SkillExtractor::new(["  Docker ", "docker", "", "AWS"]).expect("vocabulary compiles");
    assert_eq!(extractor.vocabulary_len(), 2);
}

#[test]
fn default_vocabulary_compiles_completely() {
    let extractor = SkillExtractor::default();
    assert_eq!(extractor.vocabulary_len(), DEFAULT_SKILLS.len());
}

#[test]
fn one_shot_extraction_with_caller_vocabulary() {
    let vocabulary = vec!["Kotlin".to_string(), "c#".to_string(), "java".to_string()];
    let found = extract("Android apps in Kotlin; backend in C# (.NET)", &vocabulary)
        .expect("vocabulary compiles");
    assert_eq!(found, set(&["c#", "kotlin"]));

    let empty: [&str; 0] = [];
    assert!(
        extract("Kotlin", &empty)
            .expect("empty vocabulary compiles")
            .is_empty()
    );
}
