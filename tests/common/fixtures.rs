//! Static check-in corpora used across harnesses.

/// Well-formed check-ins, one station each.
pub const VALID_CHECKINS: &[&str] = &[
    "CALLSIGN: KK4ODA\nNAME: Dana Whitfield\nLOCATION: Shelter 3, Riverside Elementary\nSTATUS: SAFE\nPOWER: GENERATOR\n",
    "CALLSIGN: W1ABC\nNAME: Sam Ortiz\nLOCATION: 14 Mill Rd\nSTATUS: NEED ASSISTANCE\nPOWER: OFF\nMESSAGE: Tree through roof.\n  Need tarp and chainsaw crew.\n",
    "callsign: n0xyz\nname: Lee Park\nlocation: County EOC\nstatus: traffic\nMESSAGE: Two priority messages for Red Cross\n",
    "CALLSIGN: VE3QRP\nNAME: Pat Moreau\nLOCATION: Cabin on Route 9\nSTATUS: SAFE\nPOWER: ON\nGRID: FN03\n",
    "\u{feff}CALLSIGN: AB1CD\r\nNAME: Jo Kim\r\nLOCATION: Harbor Marina\r\nSTATUS: Safe\r\n",
];

/// The station from the worked scenario, first transmission.
pub const KK4ODA_SAFE: &str =
    "CALLSIGN: KK4ODA\nNAME: Dana Whitfield\nLOCATION: Shelter 3\nSTATUS: SAFE\nPOWER: GENERATOR\n";

/// Same station, status changed.
pub const KK4ODA_TRAFFIC: &str =
    "CALLSIGN: KK4ODA\nNAME: Dana Whitfield\nLOCATION: Shelter 3\nSTATUS: TRAFFIC\nPOWER: GENERATOR\nMESSAGE: One message for county EOC\n";

/// Only a callsign: NAME, LOCATION and STATUS are all missing.
pub const CALLSIGN_ONLY: &str = "CALLSIGN: W1ABC\n";

/// Everything but LOCATION.
pub const MISSING_LOCATION: &str =
    "CALLSIGN: N0XYZ\nNAME: Lee Park\nSTATUS: SAFE\nPOWER: ON\n";

/// Content the parser cannot make anything of.
pub const NOT_A_CHECKIN: &[&str] = &[
    "",
    "   \n\t\n",
    "hello net control, this is just a note",
    "FREQ: 146.520\nMODE: FM\n",
];

/// Unique callsigns for volume tests.
pub fn callsigns(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("K{}T{:03}", i % 10, i)).collect()
}
