//! End-to-end tests for unused-store elimination: parse, run the pass,
//! print, and compare against the expected program.

use evmil::evm::dialect::Dialect;
use evmil::opt::unused_store::eliminate_unused_stores;
use pretty_assertions::assert_eq;

fn run(source: &str, dialect: &Dialect) -> String {
    let mut ast = evmil::parse_source("<test>", source, dialect).expect("parse error");
    eliminate_unused_stores(dialect, &mut ast);
    ast.to_string()
}

fn normalize(source: &str, dialect: &Dialect) -> String {
    evmil::parse_source("<test>", source, dialect)
        .expect("parse error")
        .to_string()
}

fn optimizes_to(source: &str, expected: &str) {
    let dialect = Dialect::evm();
    assert_eq!(run(source, &dialect), normalize(expected, &dialect));
}

fn unchanged(source: &str) {
    optimizes_to(source, source);
}

#[test]
fn overwritten_memory_store_is_removed() {
    optimizes_to(
        "{ mstore(0, 1) mstore(0, 2) return(0, 32) }",
        "{ mstore(0, 2) return(0, 32) }",
    );
}

#[test]
fn overwritten_storage_store_is_removed() {
    optimizes_to(
        "{ let k := calldataload(0) sstore(k, 1) sstore(k, 2) }",
        "{ let k := calldataload(0) sstore(k, 2) }",
    );
}

#[test]
fn read_between_writes_preserves_the_first() {
    unchanged("{ mstore(0, 1) let x := mload(0) mstore(0, 2) return(0, 32) }");
}

#[test]
fn revert_reads_its_message_from_memory() {
    unchanged("{ mstore(0, 1) revert(0, 32) }");
}

#[test]
fn reverting_builtin_drops_pending_storage() {
    optimizes_to(
        "{ let k := calldataload(0) sstore(k, 1) revert(0, 0) }",
        "{ let k := calldataload(0) revert(0, 0) }",
    );
}

#[test]
fn always_reverting_function_drops_pending_storage() {
    optimizes_to(
        r#"{
            function fail() { revert(0, 0) }
            let k := calldataload(0)
            sstore(k, 1)
            fail()
        }"#,
        r#"{
            function fail() { revert(0, 0) }
            let k := calldataload(0)
            fail()
        }"#,
    );
}

#[test]
fn terminating_builtin_keeps_storage_but_not_memory() {
    optimizes_to(
        "{ let k := calldataload(0) sstore(k, 1) mstore(0, 1) stop() }",
        "{ let k := calldataload(0) sstore(k, 1) stop() }",
    );
}

#[test]
fn returndatacopy_is_removable_only_in_the_safe_shape() {
    // returndatacopy(X, 0, returndatasize()) can never revert on an
    // out-of-bounds read, so it can be dropped like any other dead copy.
    optimizes_to(
        "{ let sz := returndatasize() returndatacopy(0, 0, sz) return(0, 0) }",
        "{ let sz := returndatasize() return(0, 0) }",
    );
    // A nonzero source offset may be out of bounds.
    unchanged("{ let sz := returndatasize() returndatacopy(0, 1, sz) return(0, 0) }");
    // A fixed length may be out of bounds as well.
    unchanged("{ returndatacopy(0, 0, 32) return(0, 0) }");
}

#[test]
fn wider_write_covers_a_narrower_one() {
    optimizes_to(
        "{ let p := calldataload(0) mstore8(p, 1) mstore(p, 2) }",
        "{ let p := calldataload(0) mstore(p, 2) }",
    );
}

#[test]
fn constant_covering_range_is_recognized() {
    optimizes_to(
        "{ let a := 32 let len := 64 mstore(a, 1) calldatacopy(0, 0, len) return(0, len) }",
        "{ let a := 32 let len := 64 calldatacopy(0, 0, len) return(0, len) }",
    );
}

#[test]
fn memory_pending_at_a_return_is_dead() {
    // return(0, 0) reads nothing, and memory does not survive the
    // termination.
    optimizes_to("{ mstore(64, 1) return(0, 0) }", "{ return(0, 0) }");
}

#[test]
fn unrelated_read_does_not_pin_a_store() {
    // The loads at p and add(p, 64) cannot touch the bytes stored at
    // add(p, 32); the store is overwritten before any aliasing read.
    optimizes_to(
        r#"{
            let p := calldataload(0)
            let q := add(p, 32)
            let r := add(p, 64)
            mstore(q, 1)
            let x := mload(r)
            mstore(q, x)
            return(0, 0)
        }"#,
        r#"{
            let p := calldataload(0)
            let q := add(p, 32)
            let r := add(p, 64)
            let x := mload(r)
            mstore(q, x)
            return(0, 0)
        }"#,
    );
}

#[test]
fn store_from_one_branch_survives_the_join() {
    // The skip path exposes the first store to the final return, so it
    // must stay even though the branch overwrites it.
    unchanged("{ mstore(0, 1) if calldataload(0) { mstore(0, 2) } return(0, 32) }");
}

#[test]
fn branch_local_store_is_not_active_after_the_join() {
    // Were the branch-local store still active on fallthrough, stop()
    // would discard it; the join pins it instead.
    unchanged("{ if calldataload(0) { mstore(0, 1) } stop() }");
}

#[test]
fn store_covered_in_every_switch_arm_is_removed() {
    optimizes_to(
        r#"{
            let k := calldataload(0)
            sstore(k, 1)
            switch calldataload(32)
            case 0 {
                sstore(k, 2)
            }
            default {
                sstore(k, 3)
            }
        }"#,
        r#"{
            let k := calldataload(0)
            switch calldataload(32)
            case 0 {
                sstore(k, 2)
            }
            default {
                sstore(k, 3)
            }
        }"#,
    );
}

#[test]
fn switch_without_default_keeps_the_fallthrough_path() {
    // With no default the switch may match nothing, so the store before
    // it is not covered on every path.
    unchanged(
        r#"{
            let k := calldataload(0)
            sstore(k, 1)
            switch calldataload(32)
            case 0 {
                sstore(k, 2)
            }
        }"#,
    );
}

#[test]
fn store_read_by_the_next_loop_iteration_is_preserved() {
    // The sload at the top of the body reads the sstore from the previous
    // iteration; without that read the final revert would discard it.
    unchanged(
        r#"{
            let k := calldataload(0)
            for { } 1 { } {
                let v := sload(k)
                let w := add(v, 1)
                sstore(k, w)
            }
            revert(0, 0)
        }"#,
    );
}

#[test]
fn store_read_within_the_loop_body_is_preserved() {
    unchanged(
        r#"{
            let c := calldataload(0)
            for { } c { } {
                mstore(0, c)
                let x := mload(0)
            }
            stop()
        }"#,
    );
}

#[test]
fn unknown_function_writes_count_as_reads() {
    // What touch() writes is not tracked, so the store before the call
    // has to be treated as potentially read.
    unchanged(
        r#"{
            function touch() {
                mstore(64, 5)
            }
            mstore(0, 1)
            touch()
            mstore(0, 2)
            return(0, 32)
        }"#,
    );
}

#[test]
fn msize_disables_memory_store_elimination() {
    unchanged("{ let m := msize() mstore(0, 1) mstore(0, 2) return(0, 32) }");
}

#[test]
fn memory_at_program_end_is_observable_by_default() {
    unchanged("{ mstore(0, 1) }");
}

#[test]
fn object_access_makes_trailing_memory_stores_dead() {
    let dialect = Dialect::evm_with_object_access();
    assert_eq!(run("{ mstore(0, 1) }", &dialect), "{ }");
    // Storage is observable either way.
    let source = "{ let k := calldataload(0) sstore(k, 1) }";
    assert_eq!(run(source, &dialect), normalize(source, &dialect));
}

#[test]
fn function_exit_marks_both_locations_used() {
    // Falling off the end of f returns to the caller, which reads the
    // stored word.
    unchanged(
        r#"{
            function f() {
                mstore(0, 7)
            }
            f()
            let x := mload(0)
            sstore(x, x)
        }"#,
    );
}

#[test]
fn elimination_is_idempotent() {
    let dialect = Dialect::evm();
    let source = r#"{
        let k := calldataload(0)
        mstore(0, 1)
        mstore(0, 2)
        sstore(k, 1)
        sstore(k, 2)
        return(0, 32)
    }"#;
    let once = run(source, &dialect);
    let twice = run(&once, &dialect);
    assert_eq!(once, twice);
}
