//! Dealerless key generation followed by a full signing session.

use permafrost_threshold::keygen::dkg::{
	self, DkgOutput, Phase1Broadcast, Phase2Broadcast, Phase2Private, Phase3Message,
	Phase4Broadcast,
};
use permafrost_threshold::{
	verify_signature, SecurityLevel, SessionId, ThresholdConfig, ThresholdError, ThresholdSigner,
	MAX_SIGN_ATTEMPTS,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Drive every party of a DKG run in process.
fn run_dkg(config: &ThresholdConfig, rng: &mut StdRng) -> Vec<DkgOutput> {
	let n = config.total_parties() as usize;
	let session = SessionId::random(rng);

	let mut states1 = Vec::new();
	let mut commits = Vec::new();
	for id in 0..n as u8 {
		let (state, commit) = dkg::start(config, id, session, rng).unwrap();
		states1.push(state);
		commits.push(commit);
	}

	let mut states2 = Vec::new();
	let mut reveals = Vec::new();
	let mut openings: Vec<Vec<Phase2Private>> = vec![Vec::new(); n];
	for (id, state) in states1.into_iter().enumerate() {
		let others: Vec<Phase1Broadcast> =
			commits.iter().filter(|c| c.party_id as usize != id).cloned().collect();
		let (state, reveal, private) = state.receive_commitments(&others).unwrap();
		states2.push(state);
		reveals.push(reveal);
		for (to, msg) in private {
			openings[to as usize].push(msg);
		}
	}

	let mut states3 = Vec::new();
	let mut pieces: Vec<Vec<Phase3Message>> = vec![Vec::new(); n];
	for (id, state) in states2.into_iter().enumerate() {
		let others: Vec<Phase2Broadcast> =
			reveals.iter().filter(|r| r.party_id as usize != id).cloned().collect();
		let (state, sent) = state.receive_reveals(rng, &others, &openings[id]).unwrap();
		states3.push(state);
		for (to, msg) in sent {
			pieces[to as usize].push(msg);
		}
	}

	let mut states4 = Vec::new();
	let mut aggregates = Vec::new();
	for (id, state) in states3.into_iter().enumerate() {
		let (state, aggregate) = state.receive_pieces(&pieces[id]).unwrap();
		states4.push(state);
		aggregates.push(aggregate);
	}

	states4
		.into_iter()
		.enumerate()
		.map(|(id, state)| {
			let others: Vec<Phase4Broadcast> =
				aggregates.iter().filter(|a| a.party_id as usize != id).cloned().collect();
			state.receive_aggregates(&others).unwrap()
		})
		.collect()
}

#[test]
fn dkg_keys_sign_and_verify() {
	let config = ThresholdConfig::new(2, 3, SecurityLevel::MlDsa44).unwrap();
	let mut rng = StdRng::seed_from_u64(500);
	let outputs = run_dkg(&config, &mut rng);

	let public_key = outputs[0].public_key.clone();
	for output in &outputs {
		assert_eq!(output.public_key, public_key);
	}

	// Sign with parties 0 and 2.
	let message = b"signed under a dealerless key";
	let mut signers = vec![
		ThresholdSigner::new(outputs[0].private_share.clone(), public_key.clone(), config)
			.unwrap(),
		ThresholdSigner::new(outputs[2].private_share.clone(), public_key.clone(), config)
			.unwrap(),
	];

	let mut signature = None;
	for _attempt in 0..MAX_SIGN_ATTEMPTS {
		let session = SessionId::random(&mut rng);
		let r1: Vec<_> =
			signers.iter_mut().map(|s| s.round1_commit(&mut rng, session).unwrap()).collect();
		let a2 = signers[0].round2_reveal(message, b"", &r1[1..]).unwrap();
		let b2 = signers[1].round2_reveal(message, b"", &r1[..1]).unwrap();
		let a3 = signers[0].round3_respond(std::slice::from_ref(&b2)).unwrap();
		let _b3 = signers[1].round3_respond(std::slice::from_ref(&a2)).unwrap();

		// The second signer combines, using the first signer's broadcast.
		match signers[1].combine(std::slice::from_ref(&a3)) {
			Ok(sig) => {
				signature = Some(sig);
				break;
			},
			Err(ThresholdError::CombinationFailed) => {
				for s in signers.iter_mut() {
					s.reset();
				}
			},
			Err(e) => panic!("unexpected signing error: {}", e),
		}
	}

	let signature = signature.expect("no attempt combined");
	assert!(verify_signature(&public_key, message, b"", &signature));
	assert!(!verify_signature(&public_key, b"something else", b"", &signature));
}

#[test]
fn three_of_five_dkg_replays_deterministically() {
	let config = ThresholdConfig::new(3, 5, SecurityLevel::MlDsa44).unwrap();
	let outputs = run_dkg(&config, &mut StdRng::seed_from_u64(501));
	let replay = run_dkg(&config, &mut StdRng::seed_from_u64(501));
	for (a, b) in outputs.iter().zip(replay.iter()) {
		assert_eq!(a.public_key, b.public_key);
	}

	// Test signature with parties 1, 3 and 4.
	let public_key = outputs[0].public_key.clone();
	let mut rng = StdRng::seed_from_u64(502);
	let message = b"post-dkg test signature";
	let mut signers: Vec<ThresholdSigner> = [1usize, 3, 4]
		.iter()
		.map(|&id| {
			ThresholdSigner::new(outputs[id].private_share.clone(), public_key.clone(), config)
				.unwrap()
		})
		.collect();

	let mut signature = None;
	for _attempt in 0..MAX_SIGN_ATTEMPTS {
		let session = SessionId::random(&mut rng);
		let r1: Vec<_> =
			signers.iter_mut().map(|s| s.round1_commit(&mut rng, session).unwrap()).collect();
		let r2: Vec<_> = signers
			.iter_mut()
			.enumerate()
			.map(|(i, s)| {
				let others: Vec<_> =
					r1.iter().enumerate().filter(|(j, _)| *j != i).map(|(_, b)| b.clone()).collect();
				s.round2_reveal(message, b"", &others).unwrap()
			})
			.collect();
		let r3: Vec<_> = signers
			.iter_mut()
			.enumerate()
			.map(|(i, s)| {
				let others: Vec<_> =
					r2.iter().enumerate().filter(|(j, _)| *j != i).map(|(_, b)| b.clone()).collect();
				s.round3_respond(&others).unwrap()
			})
			.collect();

		match signers[0].combine(&r3[1..]) {
			Ok(sig) => {
				signature = Some(sig);
				break;
			},
			Err(ThresholdError::CombinationFailed) => {
				for s in signers.iter_mut() {
					s.reset();
				}
			},
			Err(e) => panic!("unexpected signing error: {}", e),
		}
	}

	let signature = signature.expect("no attempt combined");
	assert!(verify_signature(&public_key, message, b"", &signature));
}
