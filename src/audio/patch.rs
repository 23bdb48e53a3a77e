//! Glicol program generation from a node graph.
//!
//! Each oscillator becomes a `sin` chain with a gain stage. Each reverb
//! becomes a plate diffuser feeding a bank of decaying delay taps, mixed
//! against the dry bus by wetness. Glicol diffs the program on update, so
//! unchanged chains keep running across recompiles.

use std::fmt::Write;

use super::{db_to_gain, NodeId, VirtualGraph};

/// Tap delays of the reverb tail (milliseconds, mutually prime)
const TAP_DELAYS_MS: [f32; 6] = [29.0, 61.0, 113.0, 197.0, 293.0, 421.0];

/// Silent program used when nothing is routed to the output
pub const SILENCE: &str = "o: constsig 0\n";

/// One reflection of the reverb tail
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverbTap {
    pub delay_ms: f32,
    pub gain: f32,
}

/// Reflection taps for a tail that falls by 60 dB over `decay_s` seconds
pub fn reverb_taps(decay_s: f32) -> Vec<ReverbTap> {
    TAP_DELAYS_MS
        .iter()
        .map(|&delay_ms| {
            let gain = if decay_s > 0.0 {
                // -60 dB (a factor of 10^-3) after decay_s seconds
                10.0_f32.powf(-3.0 * (delay_ms / 1000.0) / decay_s)
            } else {
                0.0
            };
            ReverbTap { delay_ms, gain }
        })
        .collect()
}

/// Render the audible part of `graph` as Glicol code
pub fn compile(graph: &VirtualGraph) -> String {
    let mut code = String::new();

    for (id, osc) in graph.oscillators() {
        let gain = if osc.running {
            db_to_gain(osc.volume_db)
        } else {
            0.0
        };
        let _ = writeln!(
            code,
            "~osc{}: sin {:.3} >> mul {:.6}",
            id.0, osc.frequency_hz, gain
        );
    }

    let mut outputs = Vec::new();
    for (id, reverb) in graph.reverbs().filter(|(_, reverb)| reverb.to_output) {
        let sources: Vec<String> = graph
            .oscillators()
            .filter(|(_, osc)| osc.reverb == Some(id))
            .map(|(osc_id, _)| format!("~osc{}", osc_id.0))
            .collect();

        write_reverb(&mut code, id, reverb.decay_s, reverb.wetness, &sources);
        outputs.push(format!("~dry{}", id.0));
        outputs.push(format!("~wet{}", id.0));
    }

    if !graph.transport_running() || outputs.is_empty() {
        code.push_str(SILENCE);
    } else {
        let _ = writeln!(code, "o: mix {}", outputs.join(" "));
    }
    code
}

fn write_reverb(code: &mut String, id: NodeId, decay_s: f32, wetness: f32, sources: &[String]) {
    let n = id.0;
    if sources.is_empty() {
        let _ = writeln!(code, "~bus{}: constsig 0", n);
    } else {
        let _ = writeln!(code, "~bus{}: mix {}", n, sources.join(" "));
    }

    let wetness = wetness.clamp(0.0, 1.0);
    let _ = writeln!(code, "~dry{}: ~bus{} >> mul {:.4}", n, n, 1.0 - wetness);
    let _ = writeln!(code, "~plate{}: ~bus{} >> plate 1.0", n, n);

    let taps = reverb_taps(decay_s);
    let mut wet_sources = vec![format!("~plate{}", n)];
    for (k, tap) in taps.iter().enumerate() {
        let _ = writeln!(
            code,
            "~r{}t{}: ~plate{} >> delayms {:.1} >> mul {:.4}",
            n, k, n, tap.delay_ms, tap.gain
        );
        wet_sources.push(format!("~r{}t{}", n, k));
    }

    // Keep the summed tail at roughly the plate's level
    let tail: f32 = taps.iter().map(|tap| tap.gain).sum();
    let _ = writeln!(
        code,
        "~wet{}: mix {} >> mul {:.4}",
        n,
        wet_sources.join(" "),
        wetness / (1.0 + tail)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SignalGraph;

    fn playing_graph() -> (VirtualGraph, NodeId, NodeId) {
        let mut graph = VirtualGraph::new();
        let reverb = graph.create_reverb(10.0, 0.5).unwrap();
        graph.connect_to_output(reverb).unwrap();
        let osc = graph.create_oscillator(220.0, 0.0).unwrap();
        graph.connect(osc, reverb).unwrap();
        graph.start(osc).unwrap();
        graph.start_transport().unwrap();
        (graph, reverb, osc)
    }

    #[test]
    fn test_taps_decay_with_delay() {
        let taps = reverb_taps(2.0);
        assert_eq!(taps.len(), TAP_DELAYS_MS.len());
        for pair in taps.windows(2) {
            assert!(pair[1].gain < pair[0].gain);
        }
        assert!(taps.iter().all(|tap| tap.gain > 0.0 && tap.gain < 1.0));
    }

    #[test]
    fn test_longer_decay_rings_louder() {
        let short = reverb_taps(0.5);
        let long = reverb_taps(10.0);
        for (s, l) in short.iter().zip(&long) {
            assert!(l.gain > s.gain);
        }
    }

    #[test]
    fn test_zero_decay_has_no_tail() {
        assert!(reverb_taps(0.0).iter().all(|tap| tap.gain == 0.0));
    }

    #[test]
    fn test_compile_routes_oscillator_through_reverb() {
        let (graph, reverb, osc) = playing_graph();
        let code = compile(&graph);

        assert!(code.contains(&format!("~osc{}: sin 220.000 >> mul 1.000000", osc.0)));
        assert!(code.contains(&format!("~bus{}: mix ~osc{}", reverb.0, osc.0)));
        assert!(code.contains(&format!("o: mix ~dry{} ~wet{}", reverb.0, reverb.0)));
    }

    #[test]
    fn test_compile_silent_when_transport_stopped() {
        let (mut graph, _, _) = playing_graph();
        graph.stop_transport();
        assert!(compile(&graph).ends_with(SILENCE));
    }

    #[test]
    fn test_stopped_oscillator_has_zero_gain() {
        let (mut graph, _, osc) = playing_graph();
        graph.stop(osc).unwrap();
        assert!(compile(&graph).contains("sin 220.000 >> mul 0.000000"));
    }

    #[test]
    fn test_empty_graph_is_silent() {
        assert_eq!(compile(&VirtualGraph::new()), SILENCE);
    }
}
