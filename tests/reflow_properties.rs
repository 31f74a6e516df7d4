//! Properties every normalized text must have, checked over a set of
//! handcrafted extraction outputs.

use notereflow::{normalize, normalize_bytes, normalize_with, ReflowConfig, SourceEncoding};

fn flat_proposal() -> String {
    let mut s = String::from(
        "LearnFlow Final Year Project Proposal Executive Summary LearnFlow is an adaptive \
         study assistant that turns lecture notes into quizzes and tracks progress for \
         every module a student takes during the semester tracking. Problem Statement \
         University students face several issues when they plan their revision: \
         \u{2022} Information Overload: too many sources \u{2022} Inefficient Study Methods: \
         re-reading instead of practice \u{2022} Time Management Issues: deadlines collide. ",
    );
    s.push_str(
        "Proposed Solution The system combines document processing with analytics. \
         Core Features: 1. Intelligent Document Processing extracts structure from uploads. \
         2. AI Question Generation System creates practice questions. \
         3. Visual Learning Path Analytics shows progress over time. \
         Students face fewer surprises when progress is visible.",
    );
    s
}

fn samples() -> Vec<String> {
    vec![
        String::new(),
        "   \r\n\t  ".to_string(),
        "Para one.\n\nPara two.".to_string(),
        "itâ€™s a â€œtestâ€\u{9D} â€” really\u{2026}".to_string(),
        "\u{25CF}one\r\n\u{25CB}  two\r\n\u{25A0}\tthree".to_string(),
        "INTRODUCTION\nThe text starts here.Then continues\n\n\n\nCONCLUSION\nDone.".to_string(),
        "1.First step\n2)Second step\na)alpha\n-5 degrees\n--- Page 2 ---".to_string(),
        "caf\u{E9} na\u{EF}ve \u{4E2D}\u{6587} \u{1F600} ok\u{7}\u{0}".to_string(),
        "Weird:Spacing;Here!Now?Yes".to_string(),
        flat_proposal(),
        "word ".repeat(150),
    ]
}

#[test]
fn normalize_is_idempotent() {
    for sample in samples() {
        let once = normalize(&sample);
        let twice = normalize(&once);
        assert_eq!(twice, once, "not idempotent for input {sample:?}");
    }
}

#[test]
fn normalize_is_idempotent_with_unicode_bullet() {
    let config = ReflowConfig::builder().bullet('\u{2022}').build().unwrap();
    for sample in samples() {
        let once = normalize_with(&sample, &config);
        assert_eq!(normalize_with(&once, &config), once, "input {sample:?}");
    }
}

#[test]
fn output_is_printable_ascii() {
    for sample in samples() {
        let out = normalize(&sample);
        assert!(
            out.bytes().all(|b| (0x20..=0x7E).contains(&b) || b == b'\n' || b == b'\t'),
            "non-ASCII output {out:?}"
        );
    }
}

#[test]
fn unicode_bullet_is_the_only_non_ascii_char() {
    let config = ReflowConfig::builder().bullet('\u{25A0}').build().unwrap();
    for sample in samples() {
        let out = normalize_with(&sample, &config);
        assert!(
            out.chars().all(|c| c.is_ascii() || c == '\u{25A0}'),
            "unexpected char in {out:?}"
        );
    }
}

#[test]
fn no_triple_newlines_and_trimmed() {
    for sample in samples() {
        let out = normalize(&sample);
        assert!(!out.contains("\n\n\n"), "triple newline in {out:?}");
        assert_eq!(out.trim(), out);
    }
}

#[test]
fn empty_input_gives_empty_output() {
    assert_eq!(normalize(""), "");
}

#[test]
fn mojibake_apostrophe_is_repaired() {
    assert!(normalize("itâ€™s").contains("it's"));
}

#[test]
fn bullet_glyphs_map_to_one_marker() {
    let out = normalize("\u{25CF} a\n\u{25CB} b\n\u{25A0} c");
    let markers: Vec<char> = out.lines().filter_map(|l| l.chars().next()).collect();
    assert_eq!(markers, vec!['*', '*', '*']);
}

#[test]
fn paragraphs_keep_one_blank_line() {
    assert_eq!(normalize("Para one.\n\nPara two."), "Para one.\n\nPara two.");
}

#[test]
fn flat_text_gets_problem_statement_paragraph() {
    let mut line = String::from("Students keep notes for many courses");
    while line.len() < 560 {
        line.push_str(" and they revise them before exams");
    }
    line.push_str(". Problem Statement Revision is unstructured for most learners today.");
    assert!(line.len() > 500 && !line.contains('\n'));

    let out = normalize(&line);
    assert!(out.contains("\n\nProblem Statement"), "got {out:?}");
}

#[test]
fn flat_proposal_is_structured() {
    let out = normalize(&flat_proposal());
    for expected in [
        "\n\nFinal Year Project Proposal\n\n",
        "\n\nExecutive Summary\n\n",
        "\n\nProblem Statement\n\n",
        "\n\n* Information Overload",
        "\n\nProposed Solution\n\n",
        "\n\n1. Intelligent Document Processing",
        "\n\n2. AI Question Generation System",
    ] {
        assert!(out.contains(expected), "missing {expected:?} in {out:?}");
    }
}

#[test]
fn decimals_are_not_split() {
    let mut text = "Measured values were 2.5 and 3.75 in every trial. ".repeat(12);
    text.push_str("Version 1.2 shipped.");
    let out = normalize(&text);
    assert!(out.contains("2.5 and 3.75"));
    assert!(!out.contains("2.\n"));
}

#[test]
fn generic_table_ignores_corpus_phrases() {
    let config = ReflowConfig::builder().generic_rules().build().unwrap();
    let mut text = String::from("Padding words here");
    while text.len() < 520 {
        text.push_str(" more padding words");
    }
    text.push_str(" Problem Statement follows");
    let out = normalize_with(&text, &config);
    assert!(!out.contains("\n\nProblem Statement"));
}

#[test]
fn headers_are_isolated() {
    let out = normalize("INTRODUCTION\nBody text.\nSUMMARY OF RESULTS\nMore body.");
    assert_eq!(
        out,
        "INTRODUCTION\n\nBody text.\n\nSUMMARY OF RESULTS\n\nMore body."
    );
}

#[test]
fn invalid_utf8_bytes_are_decoded_as_windows_1252() {
    let out = normalize_bytes(b"\x93Quoted\x94 \x96 na\xefve \x95 item", &ReflowConfig::default());
    assert_eq!(out.encoding, SourceEncoding::Windows1252);
    assert_eq!(out.text, "\"Quoted\" - nave * item");
}

#[test]
fn crlf_is_normalized() {
    assert_eq!(normalize("a\r\nb\rc"), "a\nb\nc");
}
