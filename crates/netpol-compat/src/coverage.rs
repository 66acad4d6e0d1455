//! Per-protocol port coverage.
//!
//! Coverage is one-directional: every port `required` declares under a
//! protocol must appear under the same protocol in `available`. Protocols
//! that only `available` declares are never looked at. Order and
//! multiplicity on either side do not matter.

use std::collections::BTreeSet;

use crate::model::{PortSpec, Protocol};
use crate::ports::PortMap;

/// Returns `true` when `available` covers every port of `required`.
pub fn covers(required: &PortMap, available: &PortMap) -> bool {
    required
        .iter()
        .all(|(protocol, ports)| protocol_gaps(ports, available.get(protocol)).is_empty())
}

/// Protocols of `required` with at least one port missing from `available`,
/// in protocol order.
pub fn uncovered_protocols(required: &PortMap, available: &PortMap) -> Vec<Protocol> {
    required
        .iter()
        .filter(|(protocol, ports)| !protocol_gaps(ports, available.get(protocol)).is_empty())
        .map(|(protocol, _)| *protocol)
        .collect()
}

/// The ports of `required` missing from `available`, per protocol.
///
/// Each missing port is listed once, in first-declared order. Protocols with
/// no gap have no entry.
pub fn missing_ports(required: &PortMap, available: &PortMap) -> PortMap {
    required
        .iter()
        .filter_map(|(protocol, ports)| {
            let gaps = protocol_gaps(ports, available.get(protocol));
            (!gaps.is_empty()).then_some((*protocol, gaps))
        })
        .collect()
}

fn protocol_gaps(required: &[PortSpec], available: Option<&Vec<PortSpec>>) -> Vec<PortSpec> {
    let available: BTreeSet<&PortSpec> = available.into_iter().flatten().collect();
    let mut seen = BTreeSet::new();
    required
        .iter()
        .filter(|port| !available.contains(port) && seen.insert(*port))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn ports(entries: &[(Protocol, &[&str])]) -> PortMap {
        entries
            .iter()
            .map(|(protocol, list)| {
                (
                    *protocol,
                    list.iter().map(|p| PortSpec::from(*p)).collect(),
                )
            })
            .collect()
    }

    #[test_case(&[(Protocol::Tcp, &["80"])], &[(Protocol::Tcp, &["80", "53"])] => true; "subset")]
    #[test_case(&[(Protocol::Tcp, &["80"])], &[(Protocol::Tcp, &["53"])] => false; "port missing")]
    #[test_case(&[(Protocol::Tcp, &["80"])], &[(Protocol::Udp, &["80"])] => false; "protocol missing")]
    #[test_case(&[], &[(Protocol::Udp, &["53"])] => true; "nothing required")]
    #[test_case(&[(Protocol::Tcp, &[])], &[] => true; "empty required list")]
    #[test_case(&[(Protocol::Tcp, &["80", "80"])], &[(Protocol::Tcp, &["80"])] => true; "multiplicity ignored")]
    #[test_case(&[(Protocol::Tcp, &["443", "80"])], &[(Protocol::Tcp, &["80", "443"])] => true; "order ignored")]
    #[test_case(&[(Protocol::Tcp, &["http"])], &[(Protocol::Tcp, &["80"])] => false; "named ports compare textually")]
    fn coverage(required: &[(Protocol, &[&str])], available: &[(Protocol, &[&str])]) -> bool {
        covers(&ports(required), &ports(available))
    }

    #[test]
    fn extra_available_protocols_are_ignored() {
        let required = ports(&[(Protocol::Tcp, &["80"])]);
        let available = ports(&[
            (Protocol::Tcp, &["80"]),
            (Protocol::Udp, &["53"]),
            (Protocol::Sctp, &["9000"]),
        ]);

        assert!(covers(&required, &available));
        assert!(uncovered_protocols(&required, &available).is_empty());
    }

    #[test]
    fn uncovered_protocols_lists_each_failing_protocol() {
        let required = ports(&[
            (Protocol::Tcp, &["80"]),
            (Protocol::Udp, &["53"]),
            (Protocol::Sctp, &["9000"]),
        ]);
        let available = ports(&[(Protocol::Udp, &["53"]), (Protocol::Tcp, &["443"])]);

        assert_eq!(
            uncovered_protocols(&required, &available),
            vec![Protocol::Tcp, Protocol::Sctp]
        );
    }

    #[test]
    fn missing_ports_reports_each_gap_once() {
        let required = ports(&[(Protocol::Tcp, &["80", "8080", "80", "443"])]);
        let available = ports(&[(Protocol::Tcp, &["443"])]);

        assert_eq!(
            missing_ports(&required, &available),
            ports(&[(Protocol::Tcp, &["80", "8080"])])
        );
    }
}
