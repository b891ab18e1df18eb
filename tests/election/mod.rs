mod election_case1;
mod reelection;
