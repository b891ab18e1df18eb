mod agreement;
mod out_of_sync_peer;
