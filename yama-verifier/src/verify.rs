use std::collections::{HashMap, HashSet, VecDeque};

use yama_model::{
    BcodeDesc, CallDesc, Const, ConstIndex, ConstTable, ItemDesc, ItemId, MemberDesc, Module, Op,
    RegOperand, TypeConst,
};

use crate::block::{self, Block};
use crate::env::Env;
use crate::signal::VerifierSignal;
use crate::types::VType;

type Signal = VerifierSignal;

fn object_ty(consts: &ConstTable, idx: ConstIndex) -> Result<VType, Signal> {
    match consts.get(idx) {
        Ok(Const::Object(o)) => Ok(VType::from_object_const(o)),
        Ok(Const::Type(_)) => Err(Signal::KoBNotObjectConst(idx)),
        Err(_) => Err(Signal::KoBOutOfBounds(idx)),
    }
}

fn type_const(consts: &ConstTable, idx: ConstIndex) -> Result<&TypeConst, Signal> {
    match consts.get(idx) {
        Ok(Const::Type(t)) => Ok(t),
        Ok(Const::Object(_)) => Err(Signal::KtBNotTypeConst(idx)),
        Err(_) => Err(Signal::KtBOutOfBounds(idx)),
    }
}

fn type_ty(consts: &ConstTable, idx: ConstIndex) -> Result<VType, Signal> {
    type_const(consts, idx).map(|t| VType::named(t.fq_name()))
}

/// Everything about the enclosing callable an opcode needs: its constant
/// table, capacity, the argument-list it draws from (with the implicit
/// call-object prepended for methods), and its declared return type.
struct VerifyCtx<'a> {
    consts: &'a ConstTable,
    max_locals: u16,
    arg_types: Vec<VType>,
    return_ty: VType,
}

impl<'a> VerifyCtx<'a> {
    /// Finds the function/method type-constant in this item's own constant
    /// table whose advertised fully-qualified name matches `name` — the
    /// callable type-constant `call`/`call_nr` requires to be present in
    /// `consts` for its call-object.
    fn find_callable(&self, name: &str) -> Option<&'a TypeConst> {
        self.consts.iter().find_map(|c| match c {
            Const::Type(t) if t.kind().is_callable() && t.fq_name() == name => Some(t),
            _ => None,
        })
    }

    fn resolve_params(&self, callee: &TypeConst) -> Result<Vec<VType>, Signal> {
        let sig = callee
            .callsig()
            .expect("callable type-constant always carries a callsig");
        sig.params().iter().map(|idx| type_ty(self.consts, *idx)).collect()
    }

    fn resolve_return(&self, callee: &TypeConst) -> Result<VType, Signal> {
        let sig = callee
            .callsig()
            .expect("callable type-constant always carries a callsig");
        type_ty(self.consts, sig.return_ty())
    }
}

/// Writes `new_ty` into `ra`, either by pushing a fresh top-of-stack slot
/// (`RegOperand::NewTop`) or, for an existing slot, overwriting it after
/// checking `reinit` — without `reinit`, the existing `ra` must match.
fn put_reg(
    env: &mut Env,
    ra: RegOperand,
    reinit: bool,
    new_ty: VType,
    mismatch: Signal,
    oob: impl FnOnce(u16) -> Signal,
) -> Result<(), Signal> {
    match ra {
        RegOperand::NewTop => {
            env.push(new_ty)?;
            Ok(())
        }
        RegOperand::Existing(idx) => {
            let existing = env.get(idx).ok_or_else(|| oob(idx))?;
            if !reinit && *existing != new_ty {
                return Err(mismatch);
            }
            env.reinit_existing(idx, new_ty);
            Ok(())
        }
    }
}

/// Executes one non-branching opcode's effect on the register environment.
/// `Jump`/`JumpTrue`/`JumpFalse` are handled by the block driver instead,
/// since their effect depends on which successor edge is being taken.
fn exec_op(op: &Op, env: &mut Env, ctx: &VerifyCtx) -> Result<(), Signal> {
    match op {
        Op::Noop => Ok(()),

        Op::Pop { k } => env.pop(*k as usize),

        Op::PutNone { ra, reinit } => put_reg(
            env,
            *ra,
            *reinit,
            VType::none(),
            Signal::RAWrongType,
            Signal::RAOutOfBounds,
        ),

        Op::PutConst { ra, ko_b, reinit } => {
            let ty = object_ty(ctx.consts, *ko_b)?;
            put_reg(
                env,
                *ra,
                *reinit,
                ty,
                Signal::RAAndKoBTypesDiffer,
                Signal::RAOutOfBounds,
            )
        }

        Op::PutTypeConst { ra, kt_b, reinit } => {
            // Validated for its own sake (must denote a type-constant) even
            // though the resulting slot type is always the fixed `Type`.
            type_const(ctx.consts, *kt_b)?;
            put_reg(
                env,
                *ra,
                *reinit,
                VType::type_type(),
                Signal::RAAndKtBTypesDiffer,
                Signal::RAOutOfBounds,
            )
        }

        Op::PutArg { ra, arg_b, reinit } => {
            let ty = ctx
                .arg_types
                .get(*arg_b as usize)
                .cloned()
                .ok_or(Signal::ArgBOutOfBounds(*arg_b))?;
            put_reg(
                env,
                *ra,
                *reinit,
                ty,
                Signal::RAAndArgBTypesDiffer,
                Signal::RAOutOfBounds,
            )
        }

        Op::Copy { ra, rb, reinit } => {
            let src = env.get(*rb).ok_or(Signal::RBOutOfBounds(*rb))?.clone();
            put_reg(
                env,
                *ra,
                *reinit,
                src,
                Signal::RAAndRBTypesDiffer,
                Signal::RAOutOfBounds,
            )
        }

        Op::DefaultInit { ra, kt_b, reinit } => {
            let ty = type_ty(ctx.consts, *kt_b)?;
            put_reg(
                env,
                *ra,
                *reinit,
                ty,
                Signal::RAAndKtBTypesDiffer,
                Signal::RAOutOfBounds,
            )
        }

        Op::Conv { ra, rb, kt_c, reinit } => {
            // RA is the source here; only its existence is checked, since
            // the source register may be any type.
            env.get(*ra).ok_or(Signal::RAOutOfBounds(*ra))?;
            let ty = type_ty(ctx.consts, *kt_c)?;
            put_reg(
                env,
                *rb,
                *reinit,
                ty,
                Signal::RBAndKtCTypesDiffer,
                Signal::RBOutOfBounds,
            )
        }

        Op::Call { args_a, rb, reinit } => {
            let ret_ty = do_call(env, ctx, *args_a)?;
            // No catalogue signal names the call-destination mismatch
            // specifically; it reuses the generic destination-type signal.
            put_reg(
                env,
                *rb,
                *reinit,
                ret_ty,
                Signal::RAWrongType,
                Signal::RBOutOfBounds,
            )
        }

        Op::CallNr { args_a } => {
            do_call(env, ctx, *args_a)?;
            Ok(())
        }

        Op::Ret { ra } => {
            let actual = env.get(*ra).ok_or(Signal::RAOutOfBounds(*ra))?;
            if *actual != ctx.return_ty {
                return Err(Signal::RAWrongType);
            }
            Ok(())
        }

        // Unconditional jump has no effect on the environment; only its
        // target's bounds matter, and those are checked by the block driver.
        Op::Jump { .. } => Ok(()),

        Op::JumpTrue { .. } | Op::JumpFalse { .. } => {
            unreachable!("conditional branches are excluded from the block body loop")
        }
    }
}

/// `call`/`call_nr`'s shared precondition check: validates the call-object
/// and arguments, pops the argument block, and returns the callee's return
/// type (for `call` to assign; discarded by `call_nr`).
fn do_call(env: &mut Env, ctx: &VerifyCtx, args_a: u16) -> Result<VType, Signal> {
    let n = args_a as usize;
    if n == 0 {
        return Err(Signal::ArgRsZeroObjects);
    }
    let slice = env.top_slice(n).ok_or(Signal::ArgRsOutOfBounds(args_a))?;
    let callobj_ty = slice[0].clone();
    let arg_tys: Vec<VType> = slice[1..].to_vec();

    let callee = ctx
        .find_callable(callobj_ty.fq_name())
        .ok_or(Signal::ArgRsIllegalCallobj)?;
    let params = ctx.resolve_params(callee)?;
    if params.len() != arg_tys.len() {
        return Err(Signal::ParamArgRsWrongNumber);
    }
    if params.iter().zip(arg_tys.iter()).any(|(p, a)| p != a) {
        return Err(Signal::ParamArgRsWrongTypes);
    }
    let return_ty = ctx.resolve_return(callee)?;
    env.pop(n)?;
    Ok(return_ty)
}

/// Runs the fixed-point worklist over a function body's basic blocks,
/// joining block-entry environments by strict equality.
fn verify_body(ops: &[Op], ctx: &VerifyCtx) -> Result<(), Signal> {
    if ops.is_empty() {
        return Err(Signal::BinaryIsEmpty);
    }
    let blocks = block::partition(ops);
    let block_by_start: HashMap<usize, Block> = blocks.iter().map(|b| (b.start, *b)).collect();

    let mut entry_envs: HashMap<usize, Env> = HashMap::new();
    entry_envs.insert(0, Env::new(ctx.max_locals));
    let mut worklist: VecDeque<usize> = VecDeque::from([0usize]);
    let mut visited: HashSet<usize> = HashSet::new();

    fn propagate(
        entry_envs: &mut HashMap<usize, Env>,
        worklist: &mut VecDeque<usize>,
        target: usize,
        env: Env,
    ) -> Result<(), Signal> {
        match entry_envs.get(&target) {
            Some(existing) if *existing != env => Err(Signal::ViolatesRegisterCoherence),
            Some(_) => Ok(()),
            None => {
                entry_envs.insert(target, env);
                worklist.push_back(target);
                Ok(())
            }
        }
    }

    while let Some(start_pc) = worklist.pop_front() {
        if !visited.insert(start_pc) {
            continue;
        }
        let blk = *block_by_start
            .get(&start_pc)
            .expect("worklist only ever contains block-start program counters");
        let mut env = entry_envs
            .get(&start_pc)
            .cloned()
            .expect("entry env recorded before enqueueing");

        let last_pc = blk.last_pc();
        let last_is_cond_branch = matches!(ops[last_pc], Op::JumpTrue { .. } | Op::JumpFalse { .. });
        let body_end = if last_is_cond_branch { last_pc } else { last_pc + 1 };
        for op in &ops[blk.start..body_end] {
            exec_op(op, &mut env, ctx)?;
        }

        match block::successors(ops, blk) {
            block::Successors::OutOfBounds => return Err(Signal::PutsPCOutOfBounds),
            block::Successors::FallsOffEnd => return Err(Signal::FallthroughPutsPCOutOfBounds),
            block::Successors::Targets(targets) if last_is_cond_branch => {
                let pop_a = match &ops[last_pc] {
                    Op::JumpTrue { pop_a, .. } | Op::JumpFalse { pop_a, .. } => *pop_a,
                    _ => unreachable!(),
                };
                if !env.top()?.is_bool() {
                    return Err(Signal::RTopWrongType);
                }
                let (taken_pc, fallthrough_pc) = (targets[0], targets[1]);

                let mut fallthrough_env = env.clone();
                fallthrough_env.pop(1)?;
                propagate(&mut entry_envs, &mut worklist, fallthrough_pc, fallthrough_env)?;

                let mut taken_env = env;
                taken_env.pop(1 + pop_a as usize)?;
                propagate(&mut entry_envs, &mut worklist, taken_pc, taken_env)?;
            }
            block::Successors::Targets(targets) => {
                for t in targets {
                    propagate(&mut entry_envs, &mut worklist, t, env.clone())?;
                }
            }
        }
    }
    Ok(())
}

/// Verifies one callable item (must bear both `CallDesc` and `BcodeDesc`).
#[tracing::instrument(level = "debug", skip(module), fields(self_name, item = tracing::field::Empty))]
pub fn verify_item(module: &Module, self_name: &str, id: ItemId) -> Result<(), Signal> {
    let item = module
        .get::<ItemDesc>(id)
        .expect("verify_item is only called on ids known to exist");
    tracing::Span::current().record("item", &item.name.as_str());
    let call = module
        .get::<CallDesc>(id)
        .expect("caller guarantees a call_desc is present");
    let bcode = module
        .get::<BcodeDesc>(id)
        .expect("caller guarantees a bcode_desc is present");

    let mut arg_types = Vec::new();
    if let Some(member) = module.try_get::<MemberDesc>(id) {
        let owner_name = module
            .name_of(member.owner)
            .expect("owner id was reserved with a name");
        arg_types.push(VType::named(format!("{self_name}:{owner_name}")));
    }
    for p in call.callsig.params() {
        arg_types.push(type_ty(&item.consts, *p)?);
    }
    let return_ty = type_ty(&item.consts, call.callsig.return_ty())?;

    let ctx = VerifyCtx {
        consts: &item.consts,
        max_locals: call.max_locals,
        arg_types,
        return_ty,
    };
    verify_body(bcode.bcode.ops(), &ctx)
}

/// Verifies every callable item in a module, stopping at the first failure:
/// diagnostics are reported and the whole operation aborts, it does not
/// keep checking after the first signal.
#[tracing::instrument(level = "debug", skip(module))]
pub fn verify_module(module: &Module, self_name: &str) -> Result<(), (ItemId, Signal)> {
    for id in module.view::<(CallDesc, BcodeDesc)>() {
        verify_item(module, self_name, id).map_err(|e| (id, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use yama_model::{
        Bytecode, CallFn, CallSig, ConstTable, Module, ObjectConst, TypeConstKind,
    };

    fn int_ty_idx(consts: &mut ConstTable) -> ConstIndex {
        consts.push_type(yama_model::TypeConst::new(TypeConstKind::Primitive, "yama:Int", None))
    }

    /// `put_const R0, Int 10; put_const R1, Int -4; ret R0` declared to
    /// return `Int` is accepted; changing the `ret` operand and declared
    /// return type to `Float` is rejected.
    #[test]
    fn scenario_2_ret_type_mismatch() {
        let mut consts = ConstTable::new();
        let ko10 = consts.push_object(ObjectConst::Int(10));
        let ko_neg4 = consts.push_object(ObjectConst::Int(-4));
        let kt_int = int_ty_idx(&mut consts);

        let ops = vec![
            Op::PutConst {
                ra: RegOperand::NewTop,
                ko_b: ko10,
                reinit: false,
            },
            Op::PutConst {
                ra: RegOperand::NewTop,
                ko_b: ko_neg4,
                reinit: false,
            },
            Op::Ret { ra: 0 },
        ];

        let mut m = Module::new();
        m.add_function(
            "f",
            consts.clone(),
            CallSig::new(vec![], kt_int),
            2,
            CallFn::Bcode,
        )
        .unwrap();
        m.bind_bcode("f", Bytecode::new(ops), None).unwrap();
        let id = m.id_of("f").unwrap();
        assert!(verify_item(&m, "a", id).is_ok());

        let kt_float = consts.push_type(yama_model::TypeConst::new(
            TypeConstKind::Primitive,
            "yama:Float",
            None,
        ));
        let ops2 = vec![
            Op::PutConst {
                ra: RegOperand::NewTop,
                ko_b: ko10,
                reinit: false,
            },
            Op::PutConst {
                ra: RegOperand::NewTop,
                ko_b: ko_neg4,
                reinit: false,
            },
            Op::Ret { ra: 1 },
        ];
        let mut m2 = Module::new();
        m2.add_function("f", consts, CallSig::new(vec![], kt_float), 2, CallFn::Bcode)
            .unwrap();
        m2.bind_bcode("f", Bytecode::new(ops2), None).unwrap();
        let id2 = m2.id_of("f").unwrap();
        assert_eq!(
            verify_item(&m2, "a", id2).unwrap_err(),
            Signal::RAWrongType
        );
    }

    /// A body ending in `jump Δ` whose target is one past the last
    /// instruction is rejected.
    #[test]
    fn scenario_5_jump_target_out_of_bounds() {
        let mut consts = ConstTable::new();
        let kt_int = int_ty_idx(&mut consts);
        let ops = vec![Op::Noop, Op::Jump { delta: 0 }];

        let mut m = Module::new();
        m.add_function("f", consts, CallSig::new(vec![], kt_int), 1, CallFn::Bcode)
            .unwrap();
        m.bind_bcode("f", Bytecode::new(ops), None).unwrap();
        let id = m.id_of("f").unwrap();
        assert_eq!(
            verify_item(&m, "a", id).unwrap_err(),
            Signal::PutsPCOutOfBounds
        );
    }

    /// Two branches join at the same block having set R0 to different
    /// types on each side; reading R0 after the join is rejected for
    /// violating register coherence.
    #[test]
    fn scenario_6_register_coherence_violation_on_join() {
        let mut consts = ConstTable::new();
        let ko_bool = consts.push_object(ObjectConst::Bool(true));
        let ko_int = consts.push_object(ObjectConst::Int(0));
        let ko_float = consts.push_object(ObjectConst::Float(0.0));
        let kt_int = int_ty_idx(&mut consts);

        let ops = vec![
            /* 0 */
            Op::PutConst {
                ra: RegOperand::NewTop,
                ko_b: ko_bool,
                reinit: false,
            },
            /* 1 */ Op::JumpTrue { pop_a: 0, delta: 2 },
            /* 2 */
            Op::PutConst {
                ra: RegOperand::NewTop,
                ko_b: ko_int,
                reinit: false,
            },
            /* 3 */ Op::Jump { delta: 1 },
            /* 4 */
            Op::PutConst {
                ra: RegOperand::NewTop,
                ko_b: ko_float,
                reinit: false,
            },
            /* 5 */ Op::Ret { ra: 0 },
        ];

        let mut m = Module::new();
        m.add_function("f", consts, CallSig::new(vec![], kt_int), 1, CallFn::Bcode)
            .unwrap();
        m.bind_bcode("f", Bytecode::new(ops), None).unwrap();
        let id = m.id_of("f").unwrap();
        assert_eq!(
            verify_item(&m, "a", id).unwrap_err(),
            Signal::ViolatesRegisterCoherence
        );
    }

    #[test]
    fn empty_body_is_rejected() {
        let mut consts = ConstTable::new();
        let kt_int = int_ty_idx(&mut consts);
        let mut m = Module::new();
        m.add_function("f", consts, CallSig::new(vec![], kt_int), 1, CallFn::Bcode)
            .unwrap();
        m.bind_bcode("f", Bytecode::new(vec![]), None).unwrap();
        let id = m.id_of("f").unwrap();
        assert_eq!(verify_item(&m, "a", id).unwrap_err(), Signal::BinaryIsEmpty);
    }

    #[test]
    fn pushing_beyond_max_locals_overflows() {
        let mut consts = ConstTable::new();
        let ko_int = consts.push_object(ObjectConst::Int(1));
        let kt_int = int_ty_idx(&mut consts);
        let ops = vec![
            Op::PutConst {
                ra: RegOperand::NewTop,
                ko_b: ko_int,
                reinit: false,
            },
            Op::PutConst {
                ra: RegOperand::NewTop,
                ko_b: ko_int,
                reinit: false,
            },
            Op::Ret { ra: 0 },
        ];
        let mut m = Module::new();
        m.add_function("f", consts, CallSig::new(vec![], kt_int), 1, CallFn::Bcode)
            .unwrap();
        m.bind_bcode("f", Bytecode::new(ops), None).unwrap();
        let id = m.id_of("f").unwrap();
        assert_eq!(
            verify_item(&m, "a", id).unwrap_err(),
            Signal::PushingOverflows
        );
    }
}
