use presta::{
    semantic::SemanticError,
    vm::{RuntimeError, StackEntry, VmConfig},
    Error, ErrorKind,
};

fn run_source(source: &str) -> StackEntry {
    presta::run(source).expect("Program should run to completion")
}

fn number(source: &str) -> f64 {
    match run_source(source) {
        StackEntry::Number(n) => n,
        other => panic!("Expected a number, got {other:?}"),
    }
}

fn string(source: &str) -> String {
    match run_source(source) {
        StackEntry::String(s) => s,
        other => panic!("Expected a string, got {other:?}"),
    }
}

fn error(source: &str) -> Error {
    presta::run(source).expect_err("Program should fail")
}

#[test]
fn test_add_function() {
    assert_eq!(number("~add(x y)(x + y) add{3 4}"), 7.0);
}

#[test]
fn test_arguments_keep_their_order() {
    assert_eq!(number("~sub(a b)(a - b) sub{10 4}"), 6.0);
    assert_eq!(number("~mid(a b c)(b) mid{1 2 3}"), 2.0);
}

#[test]
fn test_fib() {
    let source = r#"
    ~fib(n)(|((< n 2) n 1 (fib{(n - 1)} + fib{(n - 2)})))
    fib{10}
    "#;
    assert_eq!(number(source), 55.0);
}

#[test]
fn test_mutual_recursion() {
    let functions = r#"
    ~even(n)(|((== n 0) 1 1 odd{(n - 1)}))
    ~odd(n)(|((== n 0) 0 1 even{(n - 1)}))
    "#;
    assert_eq!(number(&format!("{functions} even{{10}}")), 1.0);
    assert_eq!(number(&format!("{functions} even{{7}}")), 0.0);
}

#[test]
fn test_repeat_accumulates() {
    let source = ":(i total)(0 0) (^ (< i 5) (: total (+ total ++i)))";
    assert_eq!(number(source), 15.0);
}

#[test]
fn test_repeat_that_never_runs() {
    assert_eq!(number("^ 0 'never'"), 0.0);
}

#[test]
fn test_match_modes() {
    assert_eq!(string("@(1 'a' 0 'b' 1 'c')"), "c");
    assert_eq!(string("|(0 'a' 1 'b' 1 'c')"), "b");
    assert_eq!(number("|(0 'a')"), 0.0);
}

#[test]
fn test_match_all_runs_every_true_branch() {
    let source = ":(n)(0) (@(1 (+= n 1) 0 (+= n 10) 'yes' (+= n 100)) + n)";
    assert_eq!(number(source), 202.0);
}

#[test]
fn test_let_values_see_outer_scope() {
    assert_eq!(number("~inc(n)(:(n)((n + 1)) n) inc{4}"), 5.0);
    assert_eq!(number(":(a)(1) :(a b)((a + 1) a) (a * 10 + b)"), 21.0);
}

#[test]
fn test_concat() {
    assert_eq!(
        string(":(name)('world') .('hello ' name '!' 42)"),
        "hello world!42"
    );
    assert_eq!(string(".()"), "");
}

#[test]
fn test_recursive_concat() {
    let source = "~stars(n)(|((< n 1) '' 1 .('*' stars{(n - 1)}))) stars{3}";
    assert_eq!(string(source), "***");
}

#[test]
fn test_operators() {
    assert_eq!(number("(7 / 2)"), 3.5);
    assert_eq!(number("% 7 2"), 1.0);
    assert_eq!(number("!0"), 1.0);
    assert_eq!(number("!'x'"), 0.0);
    assert_eq!(number("(== 'a' 'a')"), 1.0);
    assert_eq!(number("(1 != 'a')"), 1.0);
    assert_eq!(number("(&& 1 '')"), 0.0);
    assert_eq!(number("(|| 0 'x')"), 1.0);
    assert_eq!(number("((2 + 3) * 4)"), 20.0);
}

#[test]
fn test_undefined_variable_is_semantic() {
    let err = error("+ y 1");
    assert_eq!(err.kind(), ErrorKind::Semantic);
    assert!(matches!(
        err,
        Error::Semantic(SemanticError::UndefinedVariable(name)) if name == "y"
    ));
}

#[test]
fn test_wrong_argument_count() {
    let err = error("~add(x y)(x + y) add{3}");
    assert_eq!(err.kind(), ErrorKind::Semantic);
    assert!(err.to_string().starts_with("Function not found"));
}

#[test]
fn test_error_kinds() {
    assert_eq!(error("= 1").kind(), ErrorKind::Lexical);
    assert_eq!(error(":(a b)(1 2 3) a").kind(), ErrorKind::Syntax);
    assert_eq!(error("(1 2)").kind(), ErrorKind::Syntax);
    assert_eq!(error("+ 1 'a'").kind(), ErrorKind::Runtime);
}

#[test]
fn test_let_arity() {
    assert_eq!(number(":(a b)(1 2) a"), 1.0);
}

#[test]
fn test_runaway_recursion_overflows() {
    let config = VmConfig {
        stack_size: 64,
        ..VmConfig::default()
    };
    let err = presta::run_with_config("~f(n)(f{n}) f{1}", config).unwrap_err();
    assert!(matches!(
        err,
        Error::Runtime(RuntimeError::StackOverflow(64))
    ));
}

#[test]
fn test_recursion_without_arguments_overflows() {
    let config = VmConfig {
        stack_size: 16,
        ..VmConfig::default()
    };
    let err = presta::run_with_config("~f()(f{}) f{}", config).unwrap_err();
    assert!(matches!(
        err,
        Error::Runtime(RuntimeError::StackOverflow(16))
    ));
}

#[test]
fn test_step_limit() {
    let config = VmConfig {
        step_limit: Some(1000),
        ..VmConfig::default()
    };
    let err = presta::run_with_config("^ 1 1", config).unwrap_err();
    assert!(matches!(
        err,
        Error::Runtime(RuntimeError::StepLimitExceeded(1000))
    ));
}

#[test]
fn test_listing() {
    let listing = presta::compile("~add(x y)(x + y) add{3 4}")
        .unwrap()
        .to_string();
    assert!(listing.contains("0006\tCall\t0x9\n"));
    assert!(listing.contains("add:\n0009\tMov\t%0,BP-0x2\n"));
}
