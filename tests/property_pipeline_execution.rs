//! Property: pipeline execution scenarios
//!
//! The end-to-end contracts of the executor: redirection round trips,
//! unknown commands never mutate, and the whole command line commits or
//! discards as one unit.

use proptest::prelude::*;
use vshell::{execute, CommandRegistry, Vfs};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// An unregistered command name fails with `command not found` and
    /// leaves the snapshot exactly as it was.
    #[test]
    fn unknown_commands_never_mutate(name in "[a-z]{3,10}") {
        let registry = CommandRegistry::builtin();
        prop_assume!(registry.get(&name).is_none());

        let vfs = Vfs::seed();
        let out = execute(&name, &vfs, &registry);
        let needle = format!("command not found: {}", name);
        prop_assert!(out.stderr.contains(&needle));
        prop_assert!(out.stdout.is_empty());
        prop_assert_eq!(out.vfs, vfs);
    }

    /// Text written through `>` reads back through `cat` byte for byte
    /// (plus the newline echo appends).
    #[test]
    fn echo_redirect_round_trip(text in "[a-zA-Z0-9 ]{0,30}") {
        let registry = CommandRegistry::builtin();
        let vfs = Vfs::seed();

        let out = execute(&format!("echo \"{}\" > scratch", text), &vfs, &registry);
        prop_assert!(out.stderr.is_empty());
        let out = execute("cat scratch", &out.vfs, &registry);
        prop_assert_eq!(out.stdout, format!("{}\n", text));
    }

    /// Appending accumulates in order.
    #[test]
    fn append_accumulates(a in "[a-z]{1,10}", b in "[a-z]{1,10}") {
        let registry = CommandRegistry::builtin();
        let vfs = Vfs::seed();

        let out = execute(&format!("echo {} > log", a), &vfs, &registry);
        let out = execute(&format!("echo {} >> log", b), &out.vfs, &registry);
        let out = execute("cat log", &out.vfs, &registry);
        prop_assert_eq!(out.stdout, format!("{}\n{}\n", a, b));
    }
}

#[test]
fn echo_then_cat_scenario() {
    let registry = CommandRegistry::builtin();
    let vfs = Vfs::seed();

    let out = execute("echo \"hi\" > f1", &vfs, &registry);
    assert!(out.stderr.is_empty());
    let out2 = execute("cat f1", &out.vfs, &registry);
    assert_eq!(out2.stdout, "hi\n");

    let out3 = execute("echo \"bye\" >> f1", &out2.vfs, &registry);
    let out4 = execute("cat f1", &out3.vfs, &registry);
    assert_eq!(out4.stdout, "hi\nbye\n");
}

#[test]
fn three_line_file_counts_three() {
    let registry = CommandRegistry::builtin();
    let mut vfs = Vfs::seed();
    vfs.write_file("a.txt", "one\ntwo\nthree\n", false).unwrap();

    let out = execute("cat a.txt | wc -l", &vfs, &registry);
    assert!(out.stderr.is_empty());
    assert_eq!(out.stdout, "3");
}

#[test]
fn rm_on_directories_always_fails() {
    let registry = CommandRegistry::builtin();
    let vfs = Vfs::seed();

    let out = execute("mkdir d", &vfs, &registry);
    let out = execute("touch d/inner", &out.vfs, &registry);
    let full = execute("rm d", &out.vfs, &registry);
    assert_eq!(full.stderr, "rm: cannot remove 'd': Directory not empty");
    assert!(full.vfs.lookup("d").is_ok());

    // rm of a file removes exactly that entry
    let out = execute("rm d/inner", &out.vfs, &registry);
    assert!(out.stderr.is_empty());
    assert!(out.vfs.lookup("d").is_ok());
    assert!(out.vfs.lookup("d/inner").is_err());
    assert!(out.vfs.lookup("f1").is_ok());
}

#[test]
fn mid_pipeline_failure_is_atomic() {
    let registry = CommandRegistry::builtin();
    let vfs = Vfs::seed();

    let out = execute("mkdir newdir | cat ghost | wc", &vfs, &registry);
    assert_eq!(out.stderr, "cat: ghost: No such file or directory");
    assert_eq!(out.vfs, vfs);
}

#[test]
fn redirection_failure_reverts_whole_line() {
    let registry = CommandRegistry::builtin();
    let vfs = Vfs::seed();

    let out = execute("mkdir newdir | echo done > /nowhere/out", &vfs, &registry);
    assert!(!out.stderr.is_empty());
    assert_eq!(out.vfs, vfs);
    assert!(out.vfs.lookup("newdir").is_err());
}

#[test]
fn grep_pipeline_over_seeded_files() {
    let registry = CommandRegistry::builtin();
    let vfs = Vfs::seed();

    let out = execute("cat /etc/passwd | grep student | wc -l", &vfs, &registry);
    assert_eq!(out.stdout, "1");

    let out = execute("cat f2.txt | grep lines", &vfs, &registry);
    assert_eq!(out.stdout, "It has two lines.\n");
}

#[test]
fn substitute_registry_is_honored() {
    fn shout(args: &[String], _vfs: &mut Vfs, _stdin: &str) -> vshell::CommandOutput {
        vshell::CommandOutput::ok(args.join(" ").to_uppercase())
    }

    let mut registry = CommandRegistry::empty();
    registry.register("shout", shout);

    let vfs = Vfs::seed();
    let out = execute("shout hey there", &vfs, &registry);
    assert_eq!(out.stdout, "HEY THERE");
    // built-ins are absent from this table
    let out = execute("echo hi", &vfs, &registry);
    assert!(out.stderr.contains("command not found: echo"));
}
