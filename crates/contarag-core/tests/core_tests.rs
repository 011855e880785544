use std::fs;
use tempfile::TempDir;

use contarag_core::corpus::Corpus;
use contarag_core::error::Error;

#[test]
fn load_assigns_positions_and_keeps_contextualized_text() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("chunks.json");
    fs::write(
        &path,
        r#"[
            {"source": "PGC_actual", "parent_doc_index": 0, "original_chunk": "Grupo 1", "generated_context": "Financiación básica.", "contextualized_chunk": "Financiación básica.\n\nGrupo 1"},
            {"source": "PGC_1990", "parent_doc_index": 3, "original_chunk": "Cuenta 100", "generated_context": "Capital social."}
        ]"#,
    )
    .unwrap();

    let corpus = Corpus::load(&path).expect("load");
    assert_eq!(corpus.len(), 2);
    assert_eq!(corpus.get(0).unwrap().id, 0);
    assert_eq!(corpus.get(1).unwrap().id, 1);
    assert_eq!(corpus.text(0).unwrap(), "Financiación básica.\n\nGrupo 1");
    // missing contextualized text is derived from context + raw chunk
    assert_eq!(corpus.text(1).unwrap(), "Capital social.\n\nCuenta 100");
    assert_eq!(corpus.source_counts().get("PGC_1990"), Some(&1));
}

#[test]
fn missing_file_is_a_resource_load_error() {
    let tmp = TempDir::new().unwrap();
    let err = Corpus::load(&tmp.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, Error::ResourceLoad { .. }), "got {err:?}");
}

#[test]
fn malformed_json_is_a_resource_load_error() {
    let err = Corpus::from_json("{not a list").unwrap_err();
    assert!(matches!(err, Error::ResourceLoad { .. }));
}

#[test]
fn unknown_ids_are_not_found() {
    let corpus = Corpus::from_json("[]").unwrap();
    assert!(corpus.is_empty());
    assert!(matches!(corpus.text(4), Err(Error::NotFound(_))));
}
