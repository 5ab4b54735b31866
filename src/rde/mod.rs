//! Route Decision Engine: the single per-server actor owning Adj-RIB-In, Loc-RIB, and
//! Adj-RIB-Out. All mutation happens inside its event loop; everything else reaches it only
//! through `RdeHandle::queue_update`.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use log::debug;
use tokio::sync::oneshot;
use tokio::sync::mpsc;
use tokio::time;

use crate::codec::{Attribute, Origin, Prefix, UpdateMessage};

const TICK: Duration = Duration::from_secs(10);
/// Policy Information Base default degree of preference, used when no LOCAL_PREF applies.
const PIB_DEFAULT_PREFERENCE: u32 = 0;

/// Identifies the peer a (peer, UPDATE) pair arrived from; everything the tie-break needs
/// to know about the peer beyond what's in the UPDATE itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerIdentity {
    pub bgp_id: Ipv4Addr,
    pub address: IpAddr,
    pub is_ebgp: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct AdjRibInKey {
    peer_bgp_id: Ipv4Addr,
    prefix: Prefix,
}

#[derive(Debug, Clone)]
struct AdjRibInEntry {
    preference: u32,
    peer: PeerIdentity,
    path_attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocRibEntry {
    pub next_hop: Ipv4Addr,
    pub path_attributes: Vec<Attribute>,
}

enum Command {
    QueueUpdate(PeerIdentity, UpdateMessage),
    AdjRibOut(oneshot::Sender<HashMap<Prefix, LocRibEntry>>),
    #[cfg(test)]
    Snapshot(oneshot::Sender<HashMap<Prefix, LocRibEntry>>),
    #[cfg(test)]
    Tick,
}

#[derive(Clone)]
pub struct RdeHandle {
    tx: mpsc::Sender<Command>,
}

impl RdeHandle {
    pub async fn queue_update(&self, peer: PeerIdentity, update: UpdateMessage) {
        let _ = self.tx.send(Command::QueueUpdate(peer, update)).await;
    }

    /// Current Adj-RIB-Out snapshot (spec §4.4 phase 3), polled by a Session's
    /// route_advertisement timer to find routes it hasn't pushed out yet.
    pub async fn adj_rib_out(&self) -> HashMap<Prefix, LocRibEntry> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(Command::AdjRibOut(tx)).await.ok();
        rx.await.unwrap_or_default()
    }

    #[cfg(test)]
    async fn snapshot(&self) -> HashMap<Prefix, LocRibEntry> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(Command::Snapshot(tx)).await.ok();
        rx.await.unwrap_or_default()
    }

    #[cfg(test)]
    pub(crate) async fn force_tick(&self) {
        self.tx.send(Command::Tick).await.ok();
    }
}

/// States of the actor's own tiny state machine: `idle` until work queues up, `processing`
/// while running the uninterruptible three-phase pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActorState {
    Idle,
    Processing,
}

pub struct Rde {
    rx: mpsc::Receiver<Command>,
    state: ActorState,
    pending: Vec<(PeerIdentity, UpdateMessage)>,
    adj_rib_in: HashMap<AdjRibInKey, AdjRibInEntry>,
    loc_rib: HashMap<Prefix, LocRibEntry>,
    adj_rib_out: HashMap<Prefix, LocRibEntry>,
    local_asn: u32,
}

pub fn spawn(local_asn: u32) -> RdeHandle {
    let (tx, rx) = mpsc::channel(256);
    let rde = Rde {
        rx,
        state: ActorState::Idle,
        pending: Vec::new(),
        adj_rib_in: HashMap::new(),
        loc_rib: HashMap::new(),
        adj_rib_out: HashMap::new(),
        local_asn,
    };
    tokio::spawn(rde.run());
    RdeHandle { tx }
}

impl Rde {
    async fn run(mut self) {
        let mut ticker = time::interval(TICK);
        loop {
            tokio::select! {
                maybe_command = self.rx.recv() => {
                    match maybe_command {
                        Some(Command::QueueUpdate(peer, update)) => self.pending.push((peer, update)),
                        Some(Command::AdjRibOut(reply)) => {
                            let _ = reply.send(self.adj_rib_out.clone());
                        }
                        #[cfg(test)]
                        Some(Command::Snapshot(reply)) => {
                            let _ = reply.send(self.loc_rib.clone());
                        }
                        #[cfg(test)]
                        Some(Command::Tick) => self.process(),
                        None => return,
                    }
                }
                _ = ticker.tick() => {
                    if !self.pending.is_empty() {
                        self.process();
                    }
                }
            }
        }
    }

    /// The uninterruptible three-phase pipeline (spec §4.4). Nothing outside this function
    /// reads or writes any of the three RIBs.
    fn process(&mut self) {
        self.state = ActorState::Processing;
        self.phase1_degree_of_preference();
        self.phase2_route_selection();
        self.phase3_dissemination();
        self.state = ActorState::Idle;
        debug!(
            "RDE processed {} pending updates, loc-rib now has {} prefixes",
            self.pending.len(),
            self.loc_rib.len()
        );
    }

    fn phase1_degree_of_preference(&mut self) {
        for (peer, update) in self.pending.drain(..) {
            let preference = degree_of_preference(&update.path_attributes, peer.is_ebgp);
            for prefix in &update.nlri {
                self.adj_rib_in.insert(
                    AdjRibInKey {
                        peer_bgp_id: peer.bgp_id,
                        prefix: *prefix,
                    },
                    AdjRibInEntry {
                        preference,
                        peer,
                        path_attributes: update.path_attributes.clone(),
                    },
                );
            }
            for prefix in &update.withdrawn_routes {
                self.adj_rib_in.remove(&AdjRibInKey {
                    peer_bgp_id: peer.bgp_id,
                    prefix: *prefix,
                });
            }
        }
    }

    fn phase2_route_selection(&mut self) {
        let mut best: HashMap<Prefix, &AdjRibInEntry> = HashMap::new();
        for (key, entry) in &self.adj_rib_in {
            if !is_feasible(entry, self.local_asn) {
                continue;
            }
            match best.get(&key.prefix) {
                Some(current) if tie_break(current, entry) => {}
                _ => {
                    best.insert(key.prefix, entry);
                }
            }
        }
        self.loc_rib = best
            .into_iter()
            .filter_map(|(prefix, entry)| {
                next_hop(&entry.path_attributes).map(|next_hop| {
                    (
                        prefix,
                        LocRibEntry {
                            next_hop,
                            path_attributes: entry.path_attributes.clone(),
                        },
                    )
                })
            })
            .collect();
    }

    fn phase3_dissemination(&mut self) {
        self.adj_rib_out = self.loc_rib.clone();
    }
}

fn next_hop(attributes: &[Attribute]) -> Option<Ipv4Addr> {
    attributes.iter().find_map(|attr| match attr {
        Attribute::NextHop(addr) => Some(*addr),
        _ => None,
    })
}

fn as_path_len(attributes: &[Attribute]) -> usize {
    attributes
        .iter()
        .find_map(|attr| match attr {
            Attribute::AsPath(segments) => Some(segments.iter().map(|s| s.asns.len()).sum()),
            _ => None,
        })
        .unwrap_or(0)
}

fn origin_of(attributes: &[Attribute]) -> Origin {
    attributes
        .iter()
        .find_map(|attr| match attr {
            Attribute::Origin(origin) => Some(*origin),
            _ => None,
        })
        .unwrap_or(Origin::Incomplete)
}

fn med_of(attributes: &[Attribute]) -> u32 {
    attributes
        .iter()
        .find_map(|attr| match attr {
            Attribute::MultiExitDisc(med) => Some(*med),
            _ => None,
        })
        .unwrap_or(0)
}

fn local_pref_of(attributes: &[Attribute]) -> Option<u32> {
    attributes.iter().find_map(|attr| match attr {
        Attribute::LocalPref(pref) => Some(*pref),
        _ => None,
    })
}

fn contains_asn(attributes: &[Attribute], asn: u32) -> bool {
    attributes.iter().any(|attr| match attr {
        Attribute::AsPath(segments) => segments.iter().any(|s| s.asns.contains(&asn)),
        _ => false,
    })
}

fn degree_of_preference(attributes: &[Attribute], is_ebgp: bool) -> u32 {
    if is_ebgp {
        PIB_DEFAULT_PREFERENCE
    } else {
        local_pref_of(attributes).unwrap_or(PIB_DEFAULT_PREFERENCE)
    }
}

fn is_feasible(entry: &AdjRibInEntry, local_asn: u32) -> bool {
    next_hop(&entry.path_attributes).is_some() && !contains_asn(&entry.path_attributes, local_asn)
}

/// Returns `true` if `current` (the incumbent best) should be kept over `candidate`.
/// Tie-break order per spec §4.4, steps 1-8; step 6 (interior-gateway cost) is a deliberate
/// no-op per DESIGN.md, falling through to step 7.
fn tie_break(current: &AdjRibInEntry, candidate: &AdjRibInEntry) -> bool {
    use std::cmp::Ordering::*;
    let cmp = current
        .preference
        .cmp(&candidate.preference)
        .reverse() // higher preference wins
        .then_with(|| {
            as_path_len(&current.path_attributes)
                .cmp(&as_path_len(&candidate.path_attributes))
        }) // lower AS_PATH length wins
        .then_with(|| origin_of(&current.path_attributes).cmp(&origin_of(&candidate.path_attributes))) // lower Origin wins
        .then_with(|| {
            med_of(&candidate.path_attributes).cmp(&med_of(&current.path_attributes))
        }) // higher MED wins
        .then_with(|| candidate.peer.is_ebgp.cmp(&current.peer.is_ebgp)) // eBGP over iBGP
        // step 6: interior-gateway cost to NEXT_HOP — no-op, indifferent
        .then_with(|| current.peer.bgp_id.cmp(&candidate.peer.bgp_id)) // lower peer BGP-ID wins
        .then_with(|| current.peer.address.cmp(&candidate.peer.address)); // lower peer address wins
    matches!(cmp, Less)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{AsPathSegment, SegmentKind};
    use std::net::Ipv4Addr;

    fn peer(id: u8, is_ebgp: bool) -> PeerIdentity {
        PeerIdentity {
            bgp_id: Ipv4Addr::new(10, 0, 0, id),
            address: IpAddr::from(Ipv4Addr::new(10, 0, 0, id)),
            is_ebgp,
        }
    }

    fn update(prefix: Prefix, as_path_len: usize, origin: Origin) -> UpdateMessage {
        UpdateMessage {
            withdrawn_routes: Vec::new(),
            path_attributes: vec![
                Attribute::Origin(origin),
                Attribute::AsPath(vec![AsPathSegment {
                    kind: SegmentKind::AsSequence,
                    asns: (0..as_path_len as u32).collect(),
                }]),
                Attribute::NextHop(Ipv4Addr::new(192, 0, 2, 1)),
                Attribute::LocalPref(100),
            ],
            nlri: vec![prefix],
        }
    }

    // S6 — RDE tie-break
    #[tokio::test]
    async fn test_tie_break_prefers_shorter_as_path() {
        let handle = spawn(65000);
        let prefix = Prefix::new(Ipv4Addr::new(10, 1, 0, 0), 16);

        handle
            .queue_update(peer(2, true), update(prefix, 3, Origin::Igp))
            .await;
        handle
            .queue_update(peer(3, true), update(prefix, 2, Origin::Igp))
            .await;
        handle.force_tick().await;

        let snapshot = handle.snapshot().await;
        let entry = snapshot.get(&prefix).unwrap();
        assert_eq!(entry.next_hop, Ipv4Addr::new(192, 0, 2, 1));
        assert_eq!(
            entry
                .path_attributes
                .iter()
                .find_map(|a| match a {
                    Attribute::AsPath(s) => Some(s[0].asns.len()),
                    _ => None,
                })
                .unwrap(),
            2
        );
    }

    // RDE determinism
    #[tokio::test]
    async fn test_determinism_regardless_of_arrival_order() {
        let prefix = Prefix::new(Ipv4Addr::new(10, 2, 0, 0), 16);

        let a = spawn(65000);
        a.queue_update(peer(2, true), update(prefix, 3, Origin::Igp)).await;
        a.queue_update(peer(3, true), update(prefix, 2, Origin::Igp)).await;
        a.force_tick().await;
        let snapshot_a = a.snapshot().await;

        let b = spawn(65000);
        b.queue_update(peer(3, true), update(prefix, 2, Origin::Igp)).await;
        b.queue_update(peer(2, true), update(prefix, 3, Origin::Igp)).await;
        b.force_tick().await;
        let snapshot_b = b.snapshot().await;

        assert_eq!(snapshot_a.get(&prefix), snapshot_b.get(&prefix));
    }

    #[tokio::test]
    async fn test_loop_check_excludes_local_asn() {
        let handle = spawn(65000);
        let prefix = Prefix::new(Ipv4Addr::new(10, 3, 0, 0), 16);
        let mut u = update(prefix, 1, Origin::Igp);
        u.path_attributes[1] = Attribute::AsPath(vec![AsPathSegment {
            kind: SegmentKind::AsSequence,
            asns: vec![65000],
        }]);
        handle.queue_update(peer(2, true), u).await;
        handle.force_tick().await;
        let snapshot = handle.snapshot().await;
        assert!(!snapshot.contains_key(&prefix));
    }
}
