//! The fixed fallback matrix.

use crate::core::types::Provider;

/// Returns the ordered substitutes for `provider`.
///
/// Providers without an entry have no fallback and return an empty slice.
pub fn fallback_candidates(provider: Provider) -> &'static [Provider] {
    use Provider::*;

    match provider {
        VirusTotal => &[GoogleSafeBrowsing, LocalHeuristic, UrlHaus],
        GoogleSafeBrowsing => &[VirusTotal, PhishTank, LocalHeuristic],
        UrlScan => &[VirusTotal, LocalHeuristic],
        PhishTank => &[OpenPhish, GoogleSafeBrowsing, LocalHeuristic],
        OpenPhish => &[PhishTank, LocalHeuristic],
        UrlHaus => &[AlienVaultOtx, LocalHeuristic],
        AbuseIpDb => &[AlienVaultOtx, IpQualityScore],
        AlienVaultOtx => &[AbuseIpDb, UrlHaus],
        IpQualityScore => &[AbuseIpDb, LocalHeuristic],
        FileAnalyzer => &[VirusTotal, LocalHeuristic],
        VpnConfigAnalyzer => &[LocalHeuristic],
        SocialHandleAnalyzer => &[LocalHeuristic],
        MlModel | LocalHeuristic | NetworkAnalyzer | Manual => &[],
    }
}
