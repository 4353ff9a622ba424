//! Which class-file changes move a classpath fingerprint and which do not.

use sigil_classfile::AccessFlags;
use sigil_conformance::{ClassBuilder, Classpath, Harness, PRIVATE, PUBLIC};

fn widget() -> ClassBuilder {
    ClassBuilder::new("com/example/Widget")
        .field(PUBLIC, "size", "I")
        .method_with_body(PUBLIC, "<init>", "()V", &[0, 1, 0, 1, 0, 0, 0, 1, 0xb1, 0, 0, 0, 0])
        .method_with_body(PUBLIC, "draw", "(I)V", &[0, 2, 0, 2, 0, 0, 0, 1, 0xb1, 0, 0, 0, 0])
}

fn fingerprint_of(class: &ClassBuilder) -> sigil_common::ContentHash {
    let classpath = Classpath::new();
    classpath.write_class(class);
    Harness::new().snapshot(&classpath).hash
}

#[test]
fn repeated_snapshots_are_identical() {
    let classpath = Classpath::new();
    classpath.write_class(&widget());
    classpath.write_class(&ClassBuilder::new("com/example/Gadget").method(PUBLIC, "spin", "()V"));

    let first = Harness::new().snapshot(&classpath);
    let second = Harness::new().snapshot(&classpath);
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[test]
fn method_body_change_is_invisible() {
    let before = widget();
    let after = ClassBuilder::new("com/example/Widget")
        .field(PUBLIC, "size", "I")
        .method_with_body(PUBLIC, "<init>", "()V", &[0, 1, 0, 1, 0, 0, 0, 1, 0xb1, 0, 0, 0, 0])
        .method_with_body(
            PUBLIC,
            "draw",
            "(I)V",
            &[0, 3, 0, 2, 0, 0, 0, 3, 0x03, 0x3c, 0xb1, 0, 0, 0, 0],
        );
    assert_ne!(before.build(), after.build());
    assert_eq!(fingerprint_of(&before), fingerprint_of(&after));
}

#[test]
fn private_members_are_invisible() {
    let after = widget()
        .field(PRIVATE, "cachedArea", "J")
        .method(PRIVATE, "recompute", "()V");
    assert_eq!(fingerprint_of(&widget()), fingerprint_of(&after));
}

#[test]
fn debug_metadata_is_invisible() {
    let after = widget().source_file("Widget.java");
    assert_eq!(fingerprint_of(&widget()), fingerprint_of(&after));
}

#[test]
fn member_declaration_order_is_invisible() {
    let forward = ClassBuilder::new("com/example/Pair")
        .method(PUBLIC, "left", "()Ljava/lang/Object;")
        .method(PUBLIC, "right", "()Ljava/lang/Object;");
    let reversed = ClassBuilder::new("com/example/Pair")
        .method(PUBLIC, "right", "()Ljava/lang/Object;")
        .method(PUBLIC, "left", "()Ljava/lang/Object;");
    assert_eq!(fingerprint_of(&forward), fingerprint_of(&reversed));
}

#[test]
fn recompiling_for_another_target_is_invisible() {
    let after = widget().major_version(61);
    assert_eq!(fingerprint_of(&widget()), fingerprint_of(&after));
}

#[test]
fn public_signature_change_is_visible() {
    let after = ClassBuilder::new("com/example/Widget")
        .field(PUBLIC, "size", "I")
        .method(PUBLIC, "<init>", "()V")
        .method(PUBLIC, "draw", "(J)V");
    assert_ne!(fingerprint_of(&widget()), fingerprint_of(&after));
}

#[test]
fn new_public_member_is_visible() {
    let after = widget().method(PUBLIC, "erase", "()V");
    assert_ne!(fingerprint_of(&widget()), fingerprint_of(&after));
}

#[test]
fn visibility_change_is_visible() {
    let after = ClassBuilder::new("com/example/Widget")
        .field(PUBLIC | AccessFlags::FINAL, "size", "I")
        .method(PUBLIC, "<init>", "()V")
        .method(PUBLIC, "draw", "(I)V");
    assert_ne!(fingerprint_of(&widget()), fingerprint_of(&after));
}

#[test]
fn class_annotation_is_visible() {
    let after = widget().annotated("Ljava/lang/FunctionalInterface;");
    assert_ne!(fingerprint_of(&widget()), fingerprint_of(&after));
}
