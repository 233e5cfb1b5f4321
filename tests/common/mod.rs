#![allow(dead_code)]

//! Shared fixture construction for the weaving integration tests.
//!
//! The fixture family mirrors a typical assembly-to-process: a plain
//! disposable, abstract disposable bases with inheriting children, async
//! disposables with and without inheritance, and the invalid shapes the
//! weaver must reject.

use dotweave::prelude::*;

/// A module seeded with the well-known framework reference surface.
pub fn core_module() -> Module {
    ModuleBuilder::new("AssemblyToProcess.dll")
        .with_core_references()
        .build()
}

pub fn idisposable(module: &Module) -> Token {
    module
        .references()
        .type_by_full_name(names::IDISPOSABLE)
        .unwrap()
        .token
}

pub fn iasync_disposable(module: &Module) -> Token {
    module
        .references()
        .type_by_full_name("System.IAsyncDisposable")
        .unwrap()
        .token
}

pub fn task_type(module: &Module) -> Token {
    module
        .references()
        .type_by_full_name(names::TASK)
        .unwrap()
        .token
}

/// Imports `Task::FromResult()` the way async fixtures produce their handle.
pub fn task_from_result(module: &mut Module) -> Token {
    let task = task_type(module);
    module.references_mut().import_member(
        task,
        "FromResult",
        MethodSignature::static_method(TypeSignature::Class(task), vec![]),
        MethodAttributes::PUBLIC | MethodAttributes::STATIC | MethodAttributes::HIDE_BY_SIG,
    )
}

/// Adds a public instance method returning the string `"Hello World!"`.
pub fn add_hello_world_method(module: &mut Module, ty: Token, name: &str) -> Token {
    let hello = module.user_string("Hello World!");
    MethodDefBuilder::new(name)
        .returns(TypeSignature::String)
        .implementation(move |asm| {
            asm.ldstr(hello)?.ret()?;
            Ok(())
        })
        .build(module, ty)
        .unwrap()
}

/// Adds a public `Dispose` with an empty (single `ret`) body.
pub fn add_empty_dispose(module: &mut Module, ty: Token) -> Token {
    MethodDefBuilder::new(names::DISPOSE_METHOD)
        .implementation(|asm| {
            asm.ret()?;
            Ok(())
        })
        .build(module, ty)
        .unwrap()
}

/// Adds a public `DisposeAsync` returning `Task.FromResult()`.
pub fn add_async_dispose(module: &mut Module, ty: Token) -> Token {
    let from_result = task_from_result(module);
    let task = task_type(module);
    MethodDefBuilder::new(names::DISPOSE_ASYNC_METHOD)
        .returns(TypeSignature::Class(task))
        .implementation(move |asm| {
            asm.call(from_result, 0, 1)?.ret()?;
            Ok(())
        })
        .build(module, ty)
        .unwrap()
}

/// The plain `Disposable` fixture: implements the sync contract directly,
/// declares `Dispose`, `SayMeHelloWorld`, `DoNothing` and a constructor.
pub fn add_disposable(module: &mut Module) -> Token {
    let disposable = idisposable(module);
    let ty = TypeDefBuilder::new("AssemblyToProcess", "Disposable")
        .implements(disposable)
        .build(module);

    MethodDefBuilder::new(".ctor")
        .flags(
            MethodAttributes::PUBLIC
                | MethodAttributes::HIDE_BY_SIG
                | MethodAttributes::SPECIAL_NAME
                | MethodAttributes::RT_SPECIAL_NAME,
        )
        .implementation(|asm| {
            asm.ret()?;
            Ok(())
        })
        .build(module, ty)
        .unwrap();
    add_empty_dispose(module, ty);
    add_hello_world_method(module, ty, "SayMeHelloWorld");
    MethodDefBuilder::new("DoNothing")
        .implementation(|asm| {
            asm.ret()?;
            Ok(())
        })
        .build(module, ty)
        .unwrap();

    ty
}

/// The abstract `DisposableBase` fixture: implements the sync contract and
/// declares a virtual `Dispose` plus a public `DoSomething`.
pub fn add_disposable_base(module: &mut Module) -> Token {
    let disposable = idisposable(module);
    let ty = TypeDefBuilder::new("AssemblyToProcess", "DisposableBase")
        .abstract_type()
        .implements(disposable)
        .build(module);

    MethodDefBuilder::new(names::DISPOSE_METHOD)
        .virtual_new_slot()
        .implementation(|asm| {
            asm.ret()?;
            Ok(())
        })
        .build(module, ty)
        .unwrap();
    add_hello_world_method(module, ty, "DoSomething");
    ty
}

/// The abstract `AsyncDisposableBase` fixture with a virtual `DisposeAsync`.
pub fn add_async_disposable_base(module: &mut Module) -> Token {
    let contract = iasync_disposable(module);
    let ty = TypeDefBuilder::new("AssemblyToProcess", "AsyncDisposableBase")
        .abstract_type()
        .implements(contract)
        .build(module);

    let from_result = task_from_result(module);
    let task = task_type(module);
    MethodDefBuilder::new(names::DISPOSE_ASYNC_METHOD)
        .virtual_new_slot()
        .returns(TypeSignature::Class(task))
        .implementation(move |asm| {
            asm.call(from_result, 0, 1)?.ret()?;
            Ok(())
        })
        .build(module, ty)
        .unwrap();
    ty
}

/// Attaches the skip directive to a type-definition builder.
pub fn skip_marker(module: &Module) -> CustomAttribute {
    let ctor = module
        .references()
        .find_member(names::SKIP_DISPOSE_GUARD_ATTRIBUTE, names::CTOR)
        .unwrap()
        .token;
    CustomAttribute::new(ctor, names::SKIP_DISPOSE_GUARD_ATTRIBUTE)
}

/// The opcodes of a method body, in order.
pub fn opcodes_of(module: &Module, ty: Token, method: &str) -> Vec<OpCode> {
    body_of(module, ty, method)
        .instructions
        .iter()
        .map(|i| i.opcode)
        .collect()
}

/// Borrow of a method body that must exist.
pub fn body_of<'m>(module: &'m Module, ty: Token, method: &str) -> &'m MethodBody {
    module
        .type_def(ty)
        .unwrap()
        .method(method)
        .unwrap()
        .body
        .as_ref()
        .unwrap()
}

/// The guard prefix every instrumented method starts with.
pub const GUARD_PREFIX: [OpCode; 6] = [
    OpCode::Ldarg0,
    OpCode::Callvirt,
    OpCode::BrfalseS,
    OpCode::Ldstr,
    OpCode::Newobj,
    OpCode::Throw,
];

/// Asserts that a method starts with the guard sequence and still branches
/// to its original entry point.
pub fn assert_guarded(module: &Module, ty: Token, method: &str) {
    let body = body_of(module, ty, method);
    let opcodes: Vec<OpCode> = body.instructions.iter().take(6).map(|i| i.opcode).collect();
    assert_eq!(
        opcodes,
        GUARD_PREFIX.to_vec(),
        "'{method}' must start with the guard sequence"
    );
    assert!(
        body.validate_branch_targets().is_ok(),
        "'{method}' has a dangling target after weaving"
    );

    let fall_through = body.instructions[2].target().unwrap();
    assert_eq!(
        body.instructions[6].label, fall_through,
        "the guard must fall through to the original entry point of '{method}'"
    );
}

/// Asserts that a method body carries no guard sequence.
pub fn assert_not_guarded(module: &Module, ty: Token, method: &str) {
    let body = body_of(module, ty, method);
    assert!(
        !body.instructions.iter().any(|i| i.opcode == OpCode::Throw),
        "'{method}' must not carry a guard"
    );
}
