//! Tests of the pass pipeline as driven by the optimizer entry point.

use evmil::evm::dialect::Dialect;
use evmil::opt;
use evmil::utils::cli::Optimization;
use pretty_assertions::assert_eq;

fn run_all(source: &str, dialect: &Dialect) -> String {
    let mut ast = evmil::parse_source("<test>", source, dialect).expect("parse error");
    opt::optimize(dialect, &mut ast, &[Optimization::All]);
    ast.to_string()
}

#[test]
fn both_passes_run_under_all() {
    let dialect = Dialect::evm();
    let source = r#"{
        let k := calldataload(0)
        let a := 1
        a := 2
        a := 3
        sstore(k, a)
        sstore(k, 7)
    }"#;
    let expected = r#"{
        let k := calldataload(0)
        let a := 1
        a := 3
        sstore(k, 7)
    }"#;
    let expected = evmil::parse_source("<test>", expected, &dialect)
        .expect("parse error")
        .to_string();
    assert_eq!(run_all(source, &dialect), expected);
}

#[test]
fn statements_outside_the_passes_are_untouched() {
    let dialect = Dialect::evm();
    let source = r#"{
        function pay(to) {
            let ok := call(gas(), to, 1, 0, 0, 0, 0)
            if iszero(ok) { revert(0, 0) }
        }
        pay(caller())
        stop()
    }"#;
    let normalized = evmil::parse_source("<test>", source, &dialect)
        .expect("parse error")
        .to_string();
    assert_eq!(run_all(source, &dialect), normalized);
}
