#![no_main]

use hl_ad::{Dual, Floating, NodeId, Recorder, Tape, Trace};
use libfuzzer_sys::fuzz_target;

// Each 3-byte chunk is one instruction: opcode, operand a, operand b.
fn apply<T: Floating>(pool: &[T], op: u8, a: u8, b: u8) -> T {
    let x = pool[a as usize % pool.len()];
    let y = pool[b as usize % pool.len()];
    match op % 16 {
        0 => x + y,
        1 => x - y,
        2 => x * y,
        3 => x / y,
        4 => -x,
        5 => x.powi(b as i32 % 7 - 3),
        6 => x.recip(),
        7 => x.abs(),
        8 => x.sin(),
        9 => x.sin_deg(),
        10 => x.cos(),
        11 => x.cos_deg(),
        12 => x.exp(),
        13 => x.ln(),
        14 => x.mul_scalar(b as f64 / 16.0),
        _ => x.sub_from(a as f64),
    }
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    // Keep programs short so the fuzzer stays fast.
    let (seed, body) = data.split_at(2);
    let program: Vec<&[u8]> = body.chunks_exact(3).take(256).collect();
    let x0 = seed[0] as f64 / 32.0 - 4.0;
    let y0 = seed[1] as f64 / 32.0 - 4.0;

    let trace = Trace::new();
    let mut tapes: Vec<Tape<'_, f64>> = vec![trace.var(x0), trace.var(y0)];
    let mut duals = vec![Dual::var(x0), Dual::constant(y0)];
    for ins in &program {
        let t = apply(&tapes, ins[0], ins[1], ins[2]);
        let d = apply(&duals, ins[0], ins[1], ins[2]);
        tapes.push(t);
        duals.push(d);
    }

    // One node per instruction, parents strictly before children.
    assert_eq!(trace.len(), 2 + program.len());
    let nodes = trace.nodes();
    for (i, node) in nodes.iter().enumerate() {
        assert_eq!(tapes[i].id().index(), i + 1);
        assert!(node.respects_order(tapes[i].id()));
    }

    let out = tapes[tapes.len() - 1];
    let d = duals[duals.len() - 1];
    assert!(out.magnitude().to_bits() == d.val.to_bits() || (out.magnitude().is_nan() && d.val.is_nan()));

    let g = out.backward().expect("output was recorded on this trace");
    assert_eq!(g.as_slice().len(), nodes.len() + 1);
    assert_eq!(g.adjoint(NodeId::SENTINEL), Some(0.0));
});
