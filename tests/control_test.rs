mod common;
use common::*;

#[test]
fn test_if_then() {
    let mut c = Console::new();
    assert_eq!(c.enter("1 if 65 emit then"), "A");
    assert_eq!(c.enter("0 if 65 emit then"), "");
}

#[test]
fn test_if_else_then() {
    let mut c = Console::new();
    assert_eq!(c.enter("1 if 65 emit else 66 emit then"), "A");
    assert_eq!(c.enter("0 if 65 emit else 66 emit then"), "B");
}

#[test]
fn test_case() {
    let mut c = Console::new();
    let line = "case 1 of 65 emit endof 2 of 66 emit endof 67 emit endcase drop";
    assert_eq!(c.enter(&format!("1 {}", line)), "A");
    assert_eq!(c.enter(&format!("2 {}", line)), "B");
    assert_eq!(c.enter(&format!("9 {}", line)), "C");
}

#[test]
fn test_counted_loop() {
    let mut c = Console::new();
    assert_eq!(c.enter("5 0 do i . loop"), "01234");
}

#[test]
fn test_step_loops() {
    let mut c = Console::new();
    assert_eq!(c.enter("10 0 do i . 2 +loop"), "02468");
    assert_eq!(c.enter("0 10 do i . 2 -loop"), "108642");
}

#[test]
fn test_conditional_loop_skips_empty_range() {
    let mut c = Console::new();
    assert_eq!(c.enter("0 0 ?do 65 emit loop"), "");
    assert_eq!(c.enter("2 0 ?do 65 emit loop"), "AA");
}

#[test]
fn test_leave() {
    let mut c = Console::new();
    assert_eq!(c.enter("10 0 do i dup 3 = if drop leave then . loop"), "012");
}

#[test]
fn test_nested_loops_expose_both_indices() {
    let mut c = Console::new();
    assert_eq!(c.enter("2 0 do 2 0 do j . i . loop loop"), "00011011");
}

#[test]
fn test_begin_until() {
    let mut c = Console::new();
    assert_eq!(c.enter("5 begin dup . 1 - dup 0 = until drop"), "54321");
}

#[test]
fn test_begin_while_repeat() {
    let mut c = Console::new();
    assert_eq!(c.enter("0 begin dup 5 < while dup . 1 + repeat drop"), "01234");
}

#[test]
fn test_recursive_word() {
    let mut c = Console::new();
    c.parse(": fib dup 2 < if else 1- dup fib swap 1- fib + then ;");
    assert_eq!(c.enter("7 fib ."), "13");
    assert_eq!(c.enter("10 fib ."), "55");
}

#[test]
fn test_quit_sets_the_exit_status() {
    let mut c = Console::new();
    assert_eq!(c.status("7 quit"), 7);
}

#[test]
fn test_unbalanced_control_is_rejected() {
    let mut c = Console::new();
    assert_eq!(c.err("then").code(), 3);
    assert_eq!(c.err("1 if 65 emit").code(), 3);
}
