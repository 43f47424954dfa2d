mod common;
use common::*;

#[test]
fn test_accessors_store_and_fetch() {
    let mut c = Console::new();
    c.parse(": class point 1 x 1 y ;");
    assert_eq!(
        c.enter("point:new { p } 4 p point:x ! 7 p point:y ! p point:x @ . p point:y @ ."),
        "47"
    );
}

#[test]
fn test_new_zeroes_the_members() {
    let mut c = Console::new();
    c.parse(": class point 1 x 1 y ;");
    assert_eq!(c.enter("point:new { p } p point:x @ . p point:y @ ."), "00");
}

#[test]
fn test_sizeof() {
    let mut c = Console::new();
    c.parse(": class point 1 x 1 y ;");
    assert_eq!(c.enter("point:sizeof ."), "2");
}

#[test]
fn test_wide_members() {
    let mut c = Console::new();
    c.parse(": class buf 8 data 1 len ;");
    assert_eq!(c.enter("buf:sizeof ."), "9");
    assert_eq!(c.enter("buf:new { b } 3 b buf:len ! b buf:len @ ."), "3");
}

#[test]
fn test_array_indexing() {
    let mut c = Console::new();
    c.parse(": class point 1 x 1 y ;");
    assert_eq!(
        c.enter("3 point:allot { arr } 5 1 arr point:[] point:x ! 1 arr point:[] point:x @ ."),
        "5"
    );
}

#[test]
fn test_extends_appends_members() {
    let mut c = Console::new();
    c.parse(": class point 1 x 1 y ;");
    c.parse(": class point3 extends point 1 z ;");
    assert_eq!(c.enter("point3:sizeof ."), "3");
    assert_eq!(
        c.enter("point3:new { p } 9 p point3:z ! 4 p point3:x ! p point3:z @ . p point3:x @ ."),
        "94"
    );
}

#[test]
fn test_missing_base_class() {
    let mut c = Console::new();
    let error = c
        .session()
        .parse(": class pixel extends point 1 c ;", "test")
        .unwrap_err();
    assert_eq!(error.code(), 2);
}

#[test]
fn test_class_needs_at_least_one_member() {
    let mut c = Console::new();
    let error = c.session().parse(": class point x ;", "test").unwrap_err();
    assert_eq!(error.code(), 3);
}

#[test]
fn test_member_size_must_be_positive() {
    let mut c = Console::new();
    let error = c
        .session()
        .parse(": class point 0 x ;", "test")
        .unwrap_err();
    assert_eq!(error.code(), 3);
}
