//! End-to-end tests: JSONL model files on disk, through [`Source`] and
//! [`NamespaceContext`], into layout, ownership and marshaling results.

use std::collections::BTreeSet;

use girbindgen::layout::{compute_layouts, Layouts};
use girbindgen::marshal::{plan_callable, NativeValue, Recipe, WrappedValue};
use girbindgen::model::{
    AnyType, Callable, CallableKind, Class, ContainerKind, EnumMember, Enumeration,
    FieldContainer, Member, Parameter, Record, RegisteredType, ReturnValue, TransferOwnership,
    TypeRef,
};
use girbindgen::ownership::{classify, LifetimeAction, ValueUse};
use girbindgen::resolve::DestructorRef;
use girbindgen::{write_model_file, Error, ModelRecord, Source, Target};
use tempfile::TempDir;

fn record(ns: &str, ty: RegisteredType) -> ModelRecord {
    ModelRecord {
        namespace: ns.to_owned(),
        ty,
    }
}

fn typed(name: &str, c_type: &str) -> AnyType {
    AnyType::Type(TypeRef::new(name, Some(c_type)))
}

fn plain_record(name: &str, c_type: &str, members: Vec<Member>) -> Record {
    Record {
        name: name.to_owned(),
        fields: FieldContainer::new(ContainerKind::Struct, Some(c_type), members),
        get_type: None,
        pointer: false,
        foreign: false,
        copy_function: None,
        free_function: None,
        methods: Vec::new(),
    }
}

fn rectangle(c_type: &str) -> Record {
    plain_record(
        "Rectangle",
        c_type,
        vec![
            Member::field("x", typed("gint", "int")),
            Member::field("y", typed("gint", "int")),
            Member::field("width", typed("gint", "int")),
            Member::field("height", typed("gint", "int")),
        ],
    )
}

fn timeval() -> Record {
    plain_record(
        "TimeVal",
        "GTimeVal",
        vec![
            Member::field("tv_sec", typed("glong", "glong")),
            Member::field("tv_usec", typed("glong", "glong")),
        ],
    )
}

fn widget() -> Class {
    Class {
        name: "Widget".to_owned(),
        c_type: Some("GtkWidget".to_owned()),
        get_type: Some("gtk_widget_get_type".to_owned()),
        parent: None,
        refcounted: true,
        ref_sink: true,
    }
}

fn orientation() -> Enumeration {
    Enumeration {
        name: "Orientation".to_owned(),
        c_type: Some("GtkOrientation".to_owned()),
        get_type: None,
        members: vec![
            EnumMember {
                name: "horizontal".to_owned(),
                value: 0,
                c_identifier: Some("GTK_ORIENTATION_HORIZONTAL".to_owned()),
            },
            EnumMember {
                name: "vertical".to_owned(),
                value: 1,
                c_identifier: Some("GTK_ORIENTATION_VERTICAL".to_owned()),
            },
        ],
    }
}

/// A model directory with one Gdk file and one Gtk file; the Gtk file
/// also re-registers Rectangle to exercise deduplication.
fn model_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_model_file(
        dir.path().join("gdk.jsonl"),
        &[
            record("Gdk", RegisteredType::Record(rectangle("GdkRectangleOld"))),
            record("Gdk", RegisteredType::Record(timeval())),
        ],
    )
    .unwrap();
    write_model_file(
        dir.path().join("gtk.jsonl"),
        &[
            record("Gtk", RegisteredType::Class(widget())),
            record("Gtk", RegisteredType::Enumeration(orientation())),
            // Overrides the earlier Gdk registration; files read in path
            // order, so gtk.jsonl wins.
            record("Gdk", RegisteredType::Record(rectangle("GdkRectangle"))),
        ],
    )
    .unwrap();
    dir
}

fn linux() -> Target {
    Target::parse("x86_64-unknown-linux-gnu").unwrap()
}

#[test]
fn loads_and_deduplicates_model_files() {
    let dir = model_dir();
    let source = Source::new(dir.path());

    assert_eq!(source.namespaces(), vec!["Gdk".to_owned(), "Gtk".to_owned()]);
    assert_eq!(source.len(), 4);
    assert_eq!(source.types_in("Gtk").count(), 2);

    let ctx = source.into_context(linux());
    let got = ctx.resolver("Gdk").lookup("Rectangle").unwrap();
    assert_eq!(got.c_type(), Some("GdkRectangle"));
}

#[test]
fn layouts_come_out_of_the_loaded_model() {
    let dir = model_dir();
    let ctx = Source::new(dir.path()).into_context(linux());
    let res = ctx.resolver("Gdk");

    let Some(RegisteredType::Record(rect)) = res.lookup("Rectangle") else {
        panic!("Rectangle not loaded");
    };
    let layouts = compute_layouts(&rect.fields, &res).unwrap();
    assert!(matches!(layouts, Layouts::Fixed(_)));
    let layout = layouts.for_target(ctx.target());
    assert_eq!((layout.size, layout.alignment), (16, 4));
    assert_eq!(layout.offset_of("height"), Some(12));

    // TimeVal holds two C longs, so the model produces both long shapes
    // and the target picks one.
    let Some(RegisteredType::Record(tv)) = res.lookup("TimeVal") else {
        panic!("TimeVal not loaded");
    };
    let layouts = compute_layouts(&tv.fields, &res).unwrap();
    assert!(layouts.is_long_dependent());
    assert_eq!(layouts.for_long_model(true).size, 8);
    assert_eq!(layouts.for_long_model(false).size, 16);
    assert_eq!(layouts.for_target(&linux()).size, 16);
    let windows = Target::parse("x86_64-pc-windows-msvc").unwrap();
    assert_eq!(layouts.for_target(&windows).size, 8);
}

#[test]
fn ownership_follows_transfer_across_the_loaded_model() {
    let dir = model_dir();
    let ctx = Source::new(dir.path()).into_context(linux());
    let res = ctx.resolver("Gtk");

    let mut getter = Callable::new("get_parent", CallableKind::Method);
    getter.return_value = ReturnValue {
        ty: typed("Widget", "GtkWidget*"),
        transfer: TransferOwnership::None,
        nullable: true,
    };
    let borrowed = classify(&ValueUse::return_of(&getter), &res);
    // Widget floats, so the retain sinks the floating reference.
    assert_eq!(borrowed.action, LifetimeAction::Retain { sink: true });

    let mut ctor = Callable::new("new", CallableKind::Constructor);
    ctor.return_value = ReturnValue {
        ty: typed("Widget", "GtkWidget*"),
        transfer: TransferOwnership::Full,
        nullable: false,
    };
    let owned = classify(&ValueUse::return_of(&ctor), &res);
    assert_eq!(
        owned.action,
        LifetimeAction::TakeOwnership(Some(DestructorRef::Unref))
    );
}

#[test]
fn callable_plans_marshal_loaded_enum_and_object_types() {
    let dir = model_dir();
    let ctx = Source::new(dir.path()).into_context(linux());
    let res = ctx.resolver("Gtk");

    let mut method = Callable::new("set_orientation", CallableKind::Method);
    let mut this = Parameter::new("self", typed("Widget", "GtkWidget*"));
    this.instance = true;
    method.parameters.push(this);
    method.parameters.push(Parameter::new(
        "orientation",
        typed("Orientation", "GtkOrientation"),
    ));

    let planned = plan_callable(&method, &res).unwrap();
    assert_eq!(planned.parameters.len(), 2);
    assert!(planned.return_plan.is_none());

    let orientation = planned.parameters[1].into_native.as_ref().unwrap();
    assert_eq!(
        orientation
            .to_native(&WrappedValue::Enum("vertical".to_owned()))
            .unwrap(),
        NativeValue::Scalar(1)
    );
    // An ordinal outside the declared members is a hard failure, never a
    // silent default.
    assert!(matches!(
        orientation.to_wrapped(&NativeValue::Scalar(7)),
        Err(Error::UnknownEnumValue { value: 7, .. })
    ));

    let this_plan = planned.parameters[0].into_native.as_ref().unwrap();
    let wrapped = this_plan.to_wrapped(&NativeValue::Address(0x1000)).unwrap();
    assert!(matches!(
        &wrapped,
        WrappedValue::Object { type_name, address: 0x1000 } if type_name == "Widget"
    ));
    assert_eq!(
        this_plan.to_native(&wrapped).unwrap(),
        NativeValue::Address(0x1000)
    );
}

#[test]
fn flag_sets_survive_the_full_trip() {
    let dir = TempDir::new().unwrap();
    write_model_file(
        dir.path().join("gio.jsonl"),
        &[record(
            "Gio",
            RegisteredType::Bitfield(girbindgen::model::Bitfield {
                name: "IOCondition".to_owned(),
                c_type: Some("GIOCondition".to_owned()),
                get_type: None,
                members: vec![
                    EnumMember {
                        name: "in".to_owned(),
                        value: 1,
                        c_identifier: None,
                    },
                    EnumMember {
                        name: "out".to_owned(),
                        value: 4,
                        c_identifier: None,
                    },
                ],
            }),
        )],
    )
    .unwrap();
    let ctx = Source::new(dir.path()).into_context(linux());
    let res = ctx.resolver("Gio");

    let mut func = Callable::new("poll", CallableKind::Function);
    func.parameters.push(Parameter::new(
        "condition",
        typed("IOCondition", "GIOCondition"),
    ));
    let planned = plan_callable(&func, &res).unwrap();
    let plan = planned.parameters[0].into_native.as_ref().unwrap();
    assert!(matches!(plan.recipe, Recipe::Flags { .. }));

    let set: BTreeSet<String> = ["in".to_owned(), "out".to_owned()].into_iter().collect();
    let native = plan.to_native(&WrappedValue::Flags(set.clone())).unwrap();
    assert_eq!(native, NativeValue::Scalar(5));
    assert_eq!(plan.to_wrapped(&native).unwrap(), WrappedValue::Flags(set));
}

#[test]
#[should_panic(expected = "does not exist")]
fn missing_model_directories_panic() {
    let dir = TempDir::new().unwrap();
    let gone = dir.path().join("never_written");
    Source::new(gone);
}

#[test]
#[should_panic(expected = "malformed model record")]
fn malformed_model_lines_panic_with_the_offending_line() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("broken.jsonl"),
        "{\"namespace\":\"Gtk\",\"type\":{\"kind\":\"callback\",\"name\":\"Ok\"}}\n{not json\n",
    )
    .unwrap();
    Source::new(dir.path());
}
